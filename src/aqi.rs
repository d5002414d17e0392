pub mod tables;

use crate::policy::Country;
use crate::window::Pollutant;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tables::{Breakpoint, Formula, Rounding};

/// Index reported when a concentration falls outside every breakpoint bracket.
pub const UNDEFINED_INDEX: i32 = -1;

// Absorbs representation error when truncating or rounding up near a boundary.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubIndex {
    /// Concentration as fed to the formula (after any truncation).
    pub concentration: f64,
    pub index: Option<i32>,
}

/// Named severity band. Serializes as `{"level": .., "min": .., "max": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AqiLevel {
    #[serde(rename = "level")]
    pub name: &'static str,
    pub min: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i32>,
}

impl fmt::Display for AqiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AqiResult {
    pub index: i32,
    pub breakdown: BTreeMap<Pollutant, SubIndex>,
    pub level: Option<AqiLevel>,
}

impl AqiResult {
    pub fn is_defined(&self) -> bool {
        self.index != UNDEFINED_INDEX
    }

    pub fn level_name(&self) -> &'static str {
        self.level.map(|level| level.name).unwrap_or("")
    }
}

/// Computes the AQI for averaged concentrations (µg/m³) under `country`'s
/// standard. The overall index is the worst sub-index; if either pollutant
/// is off the table the index is [`UNDEFINED_INDEX`] and there is no level.
pub fn compute(avg_pm25: f64, avg_pm10: f64, country: Country) -> AqiResult {
    evaluate(country.policy().formula, avg_pm25, avg_pm10)
}

/// `"R G B"` string for a level name, or `""` when the country has no color
/// for it.
pub fn color_for(country: Country, level_name: &str) -> &'static str {
    country
        .policy()
        .colors
        .iter()
        .find(|(name, _)| *name == level_name)
        .map(|(_, rgb)| *rgb)
        .unwrap_or("")
}

fn evaluate(formula: &Formula, pm25: f64, pm10: f64) -> AqiResult {
    let pm25 = sub_index(formula.pm25, truncate(pm25, formula.pm25_decimals), formula.rounding);
    let pm10 = sub_index(formula.pm10, truncate(pm10, formula.pm10_decimals), formula.rounding);

    let index = match (pm25.index, pm10.index) {
        (Some(a), Some(b)) => a.max(b),
        _ => UNDEFINED_INDEX,
    };
    let level = if index == UNDEFINED_INDEX {
        None
    } else {
        classify(formula, index)
    };

    let mut breakdown = BTreeMap::new();
    breakdown.insert(Pollutant::Pm25, pm25);
    breakdown.insert(Pollutant::Pm10, pm10);

    AqiResult {
        index,
        breakdown,
        level,
    }
}

fn truncate(concentration: f64, decimals: Option<i32>) -> f64 {
    match decimals {
        Some(decimals) if concentration.is_finite() => {
            let factor = 10f64.powi(decimals);
            (concentration * factor + EPSILON).floor() / factor
        }
        _ => concentration,
    }
}

fn sub_index(table: &[Breakpoint], concentration: f64, rounding: Rounding) -> SubIndex {
    let index = if !concentration.is_finite() || concentration < 0.0 {
        None
    } else {
        table
            .iter()
            .find(|bp| concentration >= bp.c_low && concentration <= bp.c_high)
            .map(|bp| {
                let raw = (bp.i_high - bp.i_low) * (concentration - bp.c_low)
                    / (bp.c_high - bp.c_low)
                    + bp.i_low;
                match rounding {
                    Rounding::Nearest => raw.round() as i32,
                    Rounding::Up => (raw - EPSILON).ceil() as i32,
                }
            })
    };
    SubIndex {
        concentration,
        index,
    }
}

fn classify(formula: &Formula, index: i32) -> Option<AqiLevel> {
    formula
        .levels
        .iter()
        .find(|band| index >= band.min && band.max.map_or(true, |max| index <= max))
        .map(|band| AqiLevel {
            name: band.name,
            min: band.min,
            max: band.max,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pm25_index(result: &AqiResult) -> Option<i32> {
        result.breakdown[&Pollutant::Pm25].index
    }

    #[test]
    fn us_reference_reading_is_good() {
        let result = compute(11.0, 21.0, Country::Us);
        assert_eq!(result.index, 46);
        assert_eq!(pm25_index(&result), Some(46));
        assert_eq!(result.breakdown[&Pollutant::Pm10].index, Some(19));
        assert_eq!(result.level_name(), "Good");
        assert_eq!(result.level.unwrap().max, Some(50));
    }

    #[test]
    fn us_matches_epa_breakpoints() {
        assert_eq!(compute(12.0, 0.0, Country::Us).index, 50);
        assert_eq!(compute(12.1, 0.0, Country::Us).index, 51);
        assert_eq!(compute(35.4, 0.0, Country::Us).index, 100);
        assert_eq!(compute(35.5, 0.0, Country::Us).index, 101);
        assert_eq!(compute(55.5, 0.0, Country::Us).index, 151);
        assert_eq!(compute(150.5, 0.0, Country::Us).index, 201);
        assert_eq!(compute(500.4, 0.0, Country::Us).index, 500);
        assert_eq!(compute(0.0, 154.0, Country::Us).index, 100);
        assert_eq!(compute(40.0, 0.0, Country::Us).level_name(), "Unhealthy for Sensitive Groups");
        assert_eq!(compute(300.0, 0.0, Country::Us).level_name(), "Hazardous");
    }

    #[test]
    fn us_truncates_into_the_lower_bracket() {
        // 12.05 is truncated to 12.0 instead of falling between brackets.
        let result = compute(12.05, 10.0, Country::Us);
        assert_eq!(result.index, 50);
        assert_eq!(result.breakdown[&Pollutant::Pm25].concentration, 12.0);
        // PM10 is truncated to whole µg/m³.
        assert_eq!(compute(0.0, 54.9, Country::Us).index, 50);
    }

    #[test]
    fn cn_rounds_sub_indices_up() {
        assert_eq!(compute(35.0, 0.0, Country::Cn).index, 50);
        assert_eq!(compute(35.1, 0.0, Country::Cn).index, 51);
        assert_eq!(compute(75.0, 0.0, Country::Cn).index, 100);
        assert_eq!(compute(0.0, 150.0, Country::Cn).index, 100);
        assert_eq!(compute(11.0, 21.0, Country::Cn).level_name(), "excellent");
        assert_eq!(compute(120.0, 0.0, Country::Cn).level_name(), "moderately polluted");
    }

    #[test]
    fn eu_uses_the_caqi_grid() {
        assert_eq!(compute(15.0, 0.0, Country::Eu).index, 25);
        assert_eq!(compute(0.0, 50.0, Country::Eu).index, 50);
        assert_eq!(compute(110.0, 0.0, Country::Eu).index, 100);
        assert_eq!(compute(20.0, 10.0, Country::Eu).level_name(), "low");
        assert_eq!(compute(200.0, 10.0, Country::Eu).level_name(), "very high");
    }

    #[test]
    fn off_table_concentrations_are_undefined() {
        for (pm25, pm10, country) in [
            (600.0, 10.0, Country::Us),
            (10.0, 700.0, Country::Us),
            (-1.0, 10.0, Country::Us),
            (501.0, 10.0, Country::Cn),
            (10.0, 2000.0, Country::Eu),
            (f64::NAN, 10.0, Country::Eu),
        ] {
            let result = compute(pm25, pm10, country);
            assert_eq!(result.index, UNDEFINED_INDEX, "{pm25}/{pm10} {country}");
            assert!(result.level.is_none());
            assert!(!result.is_defined());
            assert_eq!(result.level_name(), "");
        }
        // The in-range pollutant keeps its own sub-index.
        let result = compute(600.0, 21.0, Country::Us);
        assert_eq!(result.breakdown[&Pollutant::Pm10].index, Some(19));
        assert_eq!(pm25_index(&result), None);
    }

    #[test]
    fn index_is_monotonic_in_pm25() {
        let domains = [(Country::Us, 500.4), (Country::Cn, 500.0), (Country::Eu, 990.0)];
        for (country, max_pm25) in domains {
            for pm10 in [0.0, 30.0, 120.0] {
                let mut previous = i32::MIN;
                let mut pm25 = 0.0;
                while pm25 <= max_pm25 {
                    let index = compute(pm25, pm10, country).index;
                    assert_ne!(index, UNDEFINED_INDEX, "{country} pm25={pm25}");
                    assert!(index >= previous, "{country} pm25={pm25}: {index} < {previous}");
                    previous = index;
                    pm25 += 0.05;
                }
            }
        }
    }

    #[test]
    fn every_reachable_level_has_a_color() {
        for country in Country::ALL {
            for band in country.policy().formula.levels {
                assert!(!color_for(country, band.name).is_empty(), "{country} {}", band.name);
            }
            let mut pm25 = 0.0;
            while pm25 < 500.0 {
                let result = compute(pm25, 0.0, country);
                if result.is_defined() {
                    assert!(!color_for(country, result.level_name()).is_empty());
                }
                pm25 += 1.5;
            }
        }
    }

    #[test]
    fn unmapped_level_names_have_no_color() {
        assert_eq!(color_for(Country::Us, "excellent"), "");
        assert_eq!(color_for(Country::Cn, "Good"), "");
        assert_eq!(color_for(Country::Eu, ""), "");
        assert_eq!(color_for(Country::Us, "Good"), "121 227 71");
    }

    #[test]
    fn us_top_levels_share_the_purple() {
        let hazardous = compute(400.0, 0.0, Country::Us);
        assert_eq!(hazardous.level_name(), "Hazardous");
        assert_eq!(color_for(Country::Us, hazardous.level_name()), "126 63 185");
        assert_eq!(color_for(Country::Us, "Very Unhealthy"), "126 63 185");
    }

    #[test]
    fn level_renders_as_json_object() {
        let level = compute(11.0, 21.0, Country::Us).level.unwrap();
        assert_eq!(level.to_string(), r#"{"level":"Good","min":0,"max":50}"#);
        let top = compute(400.0, 0.0, Country::Us).level.unwrap();
        assert_eq!(top.to_string(), r#"{"level":"Hazardous","min":301}"#);
    }
}

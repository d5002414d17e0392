use crate::aqi::tables::{self, Formula};
use crate::error::ConfigError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const ONE_HOUR_SECONDS: u64 = 3600;
const ONE_DAY_SECONDS: u64 = 86_400;

/// Jurisdictions with a supported AQI standard (ISO 3166-1 style codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Country {
    Cn,
    Eu,
    Us,
}

impl Country {
    pub const ALL: [Country; 3] = [Country::Cn, Country::Eu, Country::Us];

    pub fn code(self) -> &'static str {
        match self {
            Country::Cn => "CN",
            Country::Eu => "EU",
            Country::Us => "US",
        }
    }

    pub fn policy(self) -> &'static CountryPolicy {
        match self {
            Country::Cn => &CN_POLICY,
            Country::Eu => &EU_POLICY,
            Country::Us => &US_POLICY,
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Country {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Country::ALL
            .into_iter()
            .find(|country| country.code().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ConfigError::UnsupportedCountry(trimmed.to_string()))
    }
}

/// Static per-jurisdiction data: averaging period, breakpoint formula and
/// indicator colors keyed by level name.
#[derive(Debug)]
pub struct CountryPolicy {
    pub averaging_seconds: u64,
    pub formula: &'static Formula,
    pub colors: &'static [(&'static str, &'static str)],
}

static CN_POLICY: CountryPolicy = CountryPolicy {
    averaging_seconds: ONE_DAY_SECONDS,
    formula: &tables::CN,
    colors: tables::CN_COLORS,
};

static EU_POLICY: CountryPolicy = CountryPolicy {
    averaging_seconds: ONE_HOUR_SECONDS,
    formula: &tables::EU,
    colors: tables::EU_COLORS,
};

static US_POLICY: CountryPolicy = CountryPolicy {
    averaging_seconds: ONE_DAY_SECONDS,
    formula: &tables::US,
    colors: tables::US_COLORS,
};

pub fn averaging_seconds(country: Country) -> u64 {
    country.policy().averaging_seconds
}

/// Number of readings that fit in the country's averaging period at the given
/// sampling delay. Never less than one: a delay longer than the averaging
/// period keeps only the latest reading.
pub fn window_size(country: Country, sample_delay: Duration) -> usize {
    let delay = sample_delay.as_secs().max(1);
    (averaging_seconds(country) / delay).max(1) as usize
}

//! Breakpoint, level and color tables for the supported AQI standards.

#[derive(Debug, Clone, Copy)]
pub struct Breakpoint {
    pub c_low: f64,
    pub c_high: f64,
    pub i_low: f64,
    pub i_high: f64,
}

const fn bp(c_low: f64, c_high: f64, i_low: f64, i_high: f64) -> Breakpoint {
    Breakpoint {
        c_low,
        c_high,
        i_low,
        i_high,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Nearest,
    Up,
}

#[derive(Debug, Clone, Copy)]
pub struct LevelBand {
    pub name: &'static str,
    pub min: i32,
    pub max: Option<i32>,
}

const fn band(name: &'static str, min: i32, max: Option<i32>) -> LevelBand {
    LevelBand { name, min, max }
}

/// One jurisdiction's piecewise-linear formula. `*_decimals` truncates the
/// concentration to that many decimals before the bracket lookup.
#[derive(Debug)]
pub struct Formula {
    pub pm25: &'static [Breakpoint],
    pub pm10: &'static [Breakpoint],
    pub pm25_decimals: Option<i32>,
    pub pm10_decimals: Option<i32>,
    pub rounding: Rounding,
    pub levels: &'static [LevelBand],
}

// US EPA, 24-hour PM (pre-2024 revision).
pub static US: Formula = Formula {
    pm25: &[
        bp(0.0, 12.0, 0.0, 50.0),
        bp(12.1, 35.4, 51.0, 100.0),
        bp(35.5, 55.4, 101.0, 150.0),
        bp(55.5, 150.4, 151.0, 200.0),
        bp(150.5, 250.4, 201.0, 300.0),
        bp(250.5, 350.4, 301.0, 400.0),
        bp(350.5, 500.4, 401.0, 500.0),
    ],
    pm10: &[
        bp(0.0, 54.0, 0.0, 50.0),
        bp(55.0, 154.0, 51.0, 100.0),
        bp(155.0, 254.0, 101.0, 150.0),
        bp(255.0, 354.0, 151.0, 200.0),
        bp(355.0, 424.0, 201.0, 300.0),
        bp(425.0, 504.0, 301.0, 400.0),
        bp(505.0, 604.0, 401.0, 500.0),
    ],
    pm25_decimals: Some(1),
    pm10_decimals: Some(0),
    rounding: Rounding::Nearest,
    levels: &[
        band("Good", 0, Some(50)),
        band("Moderate", 51, Some(100)),
        band("Unhealthy for Sensitive Groups", 101, Some(150)),
        band("Unhealthy", 151, Some(200)),
        band("Very Unhealthy", 201, Some(300)),
        band("Hazardous", 301, None),
    ],
};

pub static US_COLORS: &[(&str, &str)] = &[
    ("Good", "121 227 71"),
    ("Moderate", "251 255 93"),
    ("Unhealthy for Sensitive Groups", "226 138 54"),
    ("Unhealthy", "234 51 36"),
    ("Very Unhealthy", "126 63 185"),
    // Same purple as Very Unhealthy.
    ("Hazardous", "126 63 185"),
];

// China HJ 633-2012, 24-hour IAQI.
pub static CN: Formula = Formula {
    pm25: &[
        bp(0.0, 35.0, 0.0, 50.0),
        bp(35.0, 75.0, 50.0, 100.0),
        bp(75.0, 115.0, 100.0, 150.0),
        bp(115.0, 150.0, 150.0, 200.0),
        bp(150.0, 250.0, 200.0, 300.0),
        bp(250.0, 350.0, 300.0, 400.0),
        bp(350.0, 500.0, 400.0, 500.0),
    ],
    pm10: &[
        bp(0.0, 50.0, 0.0, 50.0),
        bp(50.0, 150.0, 50.0, 100.0),
        bp(150.0, 250.0, 100.0, 150.0),
        bp(250.0, 350.0, 150.0, 200.0),
        bp(350.0, 420.0, 200.0, 300.0),
        bp(420.0, 500.0, 300.0, 400.0),
        bp(500.0, 600.0, 400.0, 500.0),
    ],
    pm25_decimals: None,
    pm10_decimals: None,
    rounding: Rounding::Up,
    levels: &[
        band("excellent", 0, Some(50)),
        band("good", 51, Some(100)),
        band("lightly polluted", 101, Some(150)),
        band("moderately polluted", 151, Some(200)),
        band("heavily polluted", 201, Some(300)),
        band("severely polluted", 301, None),
    ],
};

pub static CN_COLORS: &[(&str, &str)] = &[
    ("excellent", "0 255 0"),
    ("good", "255 255 0"),
    ("lightly polluted", "255 153 0"),
    ("moderately polluted", "255 0 0"),
    ("heavily polluted", "84 0 153"),
    ("severely polluted", "128 0 0"),
];

// CAQI, hourly background grid. The open-ended "very high" band keeps the
// slope of the "high" band up to index 500.
pub static EU: Formula = Formula {
    pm25: &[
        bp(0.0, 15.0, 0.0, 25.0),
        bp(15.0, 30.0, 25.0, 50.0),
        bp(30.0, 55.0, 50.0, 75.0),
        bp(55.0, 110.0, 75.0, 100.0),
        bp(110.0, 990.0, 100.0, 500.0),
    ],
    pm10: &[
        bp(0.0, 25.0, 0.0, 25.0),
        bp(25.0, 50.0, 25.0, 50.0),
        bp(50.0, 90.0, 50.0, 75.0),
        bp(90.0, 180.0, 75.0, 100.0),
        bp(180.0, 1620.0, 100.0, 500.0),
    ],
    pm25_decimals: None,
    pm10_decimals: None,
    rounding: Rounding::Nearest,
    levels: &[
        band("very low", 0, Some(25)),
        band("low", 26, Some(50)),
        band("medium", 51, Some(75)),
        band("high", 76, Some(100)),
        band("very high", 101, None),
    ],
};

pub static EU_COLORS: &[(&str, &str)] = &[
    ("very low", "0 255 0"),
    ("low", "163 255 15"),
    ("medium", "255 255 0"),
    ("high", "255 153 0"),
    ("very high", "255 0 0"),
];

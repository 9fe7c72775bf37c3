use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{AppError, Result};
use crate::types::Airport;

pub const DB_PATH: &str = "travel_data_with_miles.db";
pub const AIRPORTS_PATH: &str = "airports.csv";
pub const STYLESHEET_PATH: &str = "style.css";
pub const LOG_FILE: &str = "dashboard.log";

/// Session slot holding the last search result.
pub const RESULTS_KEY: &str = "results_df";

/// Sessions idle this long are dropped when the next one starts.
pub const SESSION_IDLE_TTL: std::time::Duration = std::time::Duration::from_secs(30 * 60);

/// Upper bound of the result-cap control.
pub const MAX_RESULTS_LIMIT: u32 = 1000;

/// Upper bound of the minimum-layover slider (minutes).
pub const MAX_LAYOVER_MINUTES: u32 = 240;

/// Bars shown in the value-per-mile chart.
pub const TOP_CHART_BARS: usize = 10;

/// Control defaults for a fresh session.
pub mod defaults {
    pub const START_DAY: u32 = 15;
    pub const MIN_LAYOVER_MINUTES: u32 = 45;
    pub const MAX_RESULTS: u32 = 100;
}

pub const APP_TITLE: &str = "Rewards Redemption Optimizer";
pub const TAGLINE: &str = "Find the best value airline routes using miles vs cash";

pub const DATASET_TIPS: &[&str] = &[
    "Origins: LAX, JFK, DXB, DFW, ORD, ATL",
    "For synthetic routing to work consistently, use LAX as the origin",
    "Destinations: JFK, LHR, DXB, ORD, ATL, DFW",
    "Synthetic is most likely to be selected as best value with JFK or LHR",
    "Dates: only August 2025 is supported",
    "Aug 31 has no layover data (directs only)",
    "For LHR as destination, use Aug 2-26 for best coverage",
    "Missing routes: DXB → LHR and LHR → JFK don't exist in the DB, as well as some other pairs",
];

/// What the backing dataset covers. Drives validation and the date pickers.
#[derive(Debug, Clone, PartialEq)]
pub struct DataCoverage {
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    /// Destination whose coverage is thin outside `well_covered`.
    pub long_haul_hub: Airport,
    pub well_covered: (NaiveDate, NaiveDate),
    pub missing_routes: Vec<(Airport, Airport)>,
}

impl DataCoverage {
    /// The month a dataset covers, with the hub's well-covered day range.
    pub fn for_month(year: i32, month: u32, covered_from: u32, covered_to: u32) -> Result<Self> {
        let first_day = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::Config(format!("invalid coverage month {year}-{month}")))?;
        let next_month = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| AppError::Config(format!("invalid coverage month {year}-{month}")))?;
        let last_day = next_month - Duration::days(1);

        let day = |d: u32| {
            first_day
                .with_day(d)
                .ok_or_else(|| AppError::Config(format!("day {d} outside {year}-{month:02}")))
        };

        Ok(Self {
            first_day,
            last_day,
            long_haul_hub: Airport::Lhr,
            well_covered: (day(covered_from)?, day(covered_to)?),
            missing_routes: vec![(Airport::Dxb, Airport::Lhr), (Airport::Lhr, Airport::Jfk)],
        })
    }

    /// August 2025, the month the bundled dataset was captured.
    pub fn august_2025() -> Self {
        Self::for_month(2025, 8, 2, 26).expect("August 2025 is a valid coverage month")
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.first_day <= date && date <= self.last_day
    }

    /// e.g. "August 2025"
    pub fn month_label(&self) -> String {
        self.first_day.format("%B %Y").to_string()
    }

    pub fn default_start(&self) -> NaiveDate {
        self.first_day
            .with_day(defaults::START_DAY)
            .unwrap_or(self.first_day)
    }

    pub fn clamp(&self, date: NaiveDate) -> NaiveDate {
        date.clamp(self.first_day, self.last_day)
    }
}

impl Default for DataCoverage {
    fn default() -> Self {
        Self::august_2025()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub airports_path: String,
    pub stylesheet_path: String,
    pub export_dir: String,
    pub log_level: String,
    pub log_file: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| DB_PATH.to_string()),
            airports_path: std::env::var("AIRPORTS_PATH")
                .unwrap_or_else(|_| AIRPORTS_PATH.to_string()),
            stylesheet_path: std::env::var("STYLESHEET_PATH")
                .unwrap_or_else(|_| STYLESHEET_PATH.to_string()),
            export_dir: std::env::var("EXPORT_DIR").unwrap_or_else(|_| ".".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_file: std::env::var("LOG_FILE").unwrap_or_else(|_| LOG_FILE.to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
        })
    }
}

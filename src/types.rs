use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::{defaults, DataCoverage, MAX_LAYOVER_MINUTES, MAX_RESULTS_LIMIT};

// ---------------------------------------------------------------------------
// Airports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Airport {
    Lax,
    Jfk,
    Dxb,
    Dfw,
    Ord,
    Atl,
    Lhr,
}

impl Airport {
    /// Origin choices, in control order.
    pub const ORIGINS: [Airport; 6] = [
        Airport::Lax,
        Airport::Jfk,
        Airport::Dxb,
        Airport::Dfw,
        Airport::Ord,
        Airport::Atl,
    ];

    /// Destination choices, in control order.
    pub const DESTINATIONS: [Airport; 6] = [
        Airport::Jfk,
        Airport::Lhr,
        Airport::Dxb,
        Airport::Ord,
        Airport::Atl,
        Airport::Dfw,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Airport::Lax => "LAX",
            Airport::Jfk => "JFK",
            Airport::Dxb => "DXB",
            Airport::Dfw => "DFW",
            Airport::Ord => "ORD",
            Airport::Atl => "ATL",
            Airport::Lhr => "LHR",
        }
    }
}

impl std::fmt::Display for Airport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// Objective
// ---------------------------------------------------------------------------

/// How the dashboard orders the results it displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    ValuePerMile,
    MinimumPrice,
}

impl std::fmt::Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Objective::ValuePerMile => "Value per Mile",
            Objective::MinimumPrice => "Minimum Price",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Search parameters
// ---------------------------------------------------------------------------

/// One render's worth of search controls. Thresholds at or below zero mean "unset".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParameters {
    pub origin: Airport,
    pub destination: Airport,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub include_synthetic: bool,
    pub min_layover_minutes: u32,
    pub objective: Objective,
    pub min_vpm_cents: f64,
    pub max_price: f64,
    pub airline_allowlist: Vec<String>,
    pub miles_balance: u64,
    pub max_results: u32,
}

impl SearchParameters {
    pub fn defaults(coverage: &DataCoverage) -> Self {
        let start = coverage.default_start();
        Self {
            origin: Airport::Lax,
            destination: Airport::Jfk,
            start_date: start,
            end_date: start,
            include_synthetic: true,
            min_layover_minutes: defaults::MIN_LAYOVER_MINUTES,
            objective: Objective::ValuePerMile,
            min_vpm_cents: 0.0,
            max_price: 0.0,
            airline_allowlist: Vec::new(),
            miles_balance: 0,
            max_results: defaults::MAX_RESULTS,
        }
    }

    /// Pull slider and numeric controls back inside their ranges.
    pub fn clamped(mut self) -> Self {
        self.min_layover_minutes = self.min_layover_minutes.min(MAX_LAYOVER_MINUTES);
        self.max_results = self.max_results.clamp(1, MAX_RESULTS_LIMIT);
        if !(self.min_vpm_cents >= 0.0) {
            self.min_vpm_cents = 0.0;
        }
        if !(self.max_price >= 0.0) {
            self.max_price = 0.0;
        }
        self
    }
}

/// Split comma-separated allowlist text into trimmed, non-blank names.
pub fn parse_allowlist(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Recommender rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    Direct,
    Synthetic,
}

impl std::fmt::Display for RouteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteType::Direct => write!(f, "direct"),
            RouteType::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Miles as the recommender hands them over: usually numeric, sometimes text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MilesField {
    Number(f64),
    Text(String),
}

impl MilesField {
    /// Numeric value, or `None` when the text does not parse.
    pub fn coerce(&self) -> Option<f64> {
        match self {
            MilesField::Number(n) if n.is_finite() => Some(*n),
            MilesField::Number(_) => None,
            MilesField::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightLeg {
    #[serde(default)]
    pub airline: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub flight_number: Option<String>,
    #[serde(default)]
    pub departure_time: Option<String>,
    #[serde(default)]
    pub arrival_time: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// A leg sequence checked into its display shape. Legs past the second are ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Itinerary<'a> {
    NoLegs,
    Direct(&'a FlightLeg),
    Connecting(&'a FlightLeg, &'a FlightLeg),
}

impl<'a> Itinerary<'a> {
    pub fn from_legs(legs: Option<&'a [FlightLeg]>) -> Self {
        match legs.unwrap_or_default() {
            [] => Itinerary::NoLegs,
            [only] => Itinerary::Direct(only),
            [first, second, ..] => Itinerary::Connecting(first, second),
        }
    }
}

/// One recommender row. Every field is optional: a column the recommender did
/// not return is simply `None` on every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteRow {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, rename = "type")]
    pub route_type: Option<RouteType>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub airline: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub miles: Option<MilesField>,
    #[serde(default)]
    pub taxes: Option<f64>,
    #[serde(default)]
    pub value_per_mile_cents: Option<f64>,
    #[serde(default)]
    pub flights_json: Option<Vec<FlightLeg>>,
    #[serde(default)]
    pub route: Option<String>,
}

impl RouteRow {
    pub fn itinerary(&self) -> Itinerary<'_> {
        Itinerary::from_legs(self.flights_json.as_deref())
    }
}

pub type ResultSet = Vec<RouteRow>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_drops_blanks() {
        assert_eq!(
            parse_allowlist(" Delta, ,JetBlue ,"),
            vec!["Delta".to_string(), "JetBlue".to_string()]
        );
        assert!(parse_allowlist("   ").is_empty());
    }

    #[test]
    fn miles_coercion() {
        assert_eq!(MilesField::Number(25000.0).coerce(), Some(25000.0));
        assert_eq!(MilesField::Text(" 12500 ".into()).coerce(), Some(12500.0));
        assert_eq!(MilesField::Text("n/a".into()).coerce(), None);
    }

    #[test]
    fn itinerary_shapes() {
        let leg = FlightLeg::default();
        let legs = vec![leg.clone(), leg.clone(), leg.clone()];
        assert_eq!(Itinerary::from_legs(None), Itinerary::NoLegs);
        assert_eq!(Itinerary::from_legs(Some(&legs[..0])), Itinerary::NoLegs);
        assert!(matches!(Itinerary::from_legs(Some(&legs[..1])), Itinerary::Direct(_)));
        assert!(matches!(Itinerary::from_legs(Some(&legs)), Itinerary::Connecting(_, _)));
    }

    #[test]
    fn row_deserializes_loose_json() {
        let raw = r#"{
            "date": "2025-08-10", "type": "synthetic", "airline": "Delta",
            "price": 420.5, "miles": "30000", "value_per_mile_cents": 1.4,
            "flights_json": [
                {"airline": "Delta", "flight_number": 101,
                 "departure_time": "2025-08-10T06:00", "arrival_time": "2025-08-10T10:00"},
                {"airline": "Delta", "flight_number": "DL7"}
            ]
        }"#;
        let row: RouteRow = serde_json::from_str(raw).unwrap();
        assert_eq!(row.route_type, Some(RouteType::Synthetic));
        assert_eq!(row.miles.as_ref().and_then(MilesField::coerce), Some(30000.0));
        let legs = row.flights_json.as_ref().unwrap();
        assert_eq!(legs[0].flight_number.as_deref(), Some("101"));
        assert_eq!(legs[1].flight_number.as_deref(), Some("DL7"));
        assert!(row.taxes.is_none());
    }

    #[test]
    fn clamped_bounds_controls() {
        let mut p = SearchParameters::defaults(&DataCoverage::august_2025());
        p.max_results = 0;
        p.min_layover_minutes = 999;
        p.max_price = -5.0;
        let p = p.clamped();
        assert_eq!(p.max_results, 1);
        assert_eq!(p.min_layover_minutes, MAX_LAYOVER_MINUTES);
        assert_eq!(p.max_price, 0.0);
    }
}

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::types::{FlightLeg, Itinerary};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];

/// A parsed leg time. Offsets are kept when the source carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl Timestamp {
    /// The wall clock as written, offset dropped.
    pub fn wall_clock(self) -> NaiveDateTime {
        match self {
            Timestamp::Aware(dt) => dt.naive_local(),
            Timestamp::Naive(dt) => dt,
        }
    }
}

/// Parse an ISO-8601 style timestamp, with or without a UTC offset.
pub fn parse_instant(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(Timestamp::Aware(dt));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(Timestamp::Aware(dt));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Timestamp::Naive(dt));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Timestamp::Naive)
}

/// Wall-clock reading of a timestamp, for display only.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    parse_instant(raw).map(Timestamp::wall_clock)
}

/// `YYYY-MM-DD HH:MM`, or the raw text when it does not parse.
pub fn format_timestamp(raw: Option<&str>) -> String {
    match raw {
        None => String::new(),
        Some(s) => match parse_timestamp(s) {
            Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
            None => s.to_string(),
        },
    }
}

/// Minutes from leg 1 arrival to leg 2 departure, truncated toward zero.
/// Unknown when one side carries an offset and the other does not.
pub fn layover_minutes(first: &FlightLeg, second: &FlightLeg) -> Option<i64> {
    let arrived = parse_instant(first.arrival_time.as_deref()?)?;
    let departs = parse_instant(second.departure_time.as_deref()?)?;
    let elapsed = match (arrived, departs) {
        (Timestamp::Aware(a), Timestamp::Aware(d)) => d - a,
        (Timestamp::Naive(a), Timestamp::Naive(d)) => d - a,
        _ => return None,
    };
    Some(elapsed.num_minutes())
}

fn flight_label(leg: &FlightLeg) -> String {
    format!(
        "{} {}",
        leg.airline.as_deref().unwrap_or(""),
        leg.flight_number.as_deref().unwrap_or("")
    )
    .trim()
    .to_string()
}

/// Fixed leg-1/leg-2 display columns. Absent legs are blank strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegColumns {
    pub leg1_flight: String,
    pub leg1_departs: String,
    pub leg1_arrives: String,
    pub leg2_flight: String,
    pub leg2_departs: String,
    pub leg2_arrives: String,
    pub layover_minutes: Option<i64>,
}

impl LegColumns {
    pub fn flatten(itinerary: &Itinerary<'_>) -> Self {
        let mut cols = LegColumns::default();
        let (first, second) = match itinerary {
            Itinerary::NoLegs => return cols,
            Itinerary::Direct(first) => (*first, None),
            Itinerary::Connecting(first, second) => (*first, Some(*second)),
        };

        cols.leg1_flight = flight_label(first);
        cols.leg1_departs = format_timestamp(first.departure_time.as_deref());
        cols.leg1_arrives = format_timestamp(first.arrival_time.as_deref());

        if let Some(second) = second {
            cols.leg2_flight = flight_label(second);
            cols.leg2_departs = format_timestamp(second.departure_time.as_deref());
            cols.leg2_arrives = format_timestamp(second.arrival_time.as_deref());
            cols.layover_minutes = layover_minutes(first, second);
        }
        cols
    }
}

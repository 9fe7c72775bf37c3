use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::reshape::DisplayTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportCoordinate {
    pub iata: String,
    pub lat: f64,
    pub lon: f64,
}

/// Read the `iata,lat,lon` lookup. `Ok(None)` when the file is absent.
/// Records that fail to parse are skipped.
pub fn load_airports(path: &Path) -> Result<Option<Vec<AirportCoordinate>>> {
    if !path.exists() {
        debug!(path = %path.display(), "airports lookup absent");
        return Ok(None);
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let mut airports = Vec::new();
    for (line, record) in reader.deserialize::<AirportCoordinate>().enumerate() {
        match record {
            Ok(mut airport) => {
                airport.iata = airport.iata.to_uppercase();
                airports.push(airport);
            }
            Err(e) => warn!(line = line + 2, "skipping airports record: {e}"),
        }
    }
    Ok(Some(airports))
}

fn route_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\b[A-Z]{3}\b").expect("static route-token pattern"))
}

/// Airport codes the view mentions: origins, destinations, and three-letter
/// upper-case tokens inside route labels.
pub fn referenced_codes(table: &DisplayTable) -> BTreeSet<String> {
    let mut codes = BTreeSet::new();
    for row in &table.rows {
        for code in [&row.origin, &row.destination].into_iter().flatten() {
            let code = code.trim();
            if !code.is_empty() {
                codes.insert(code.to_uppercase());
            }
        }
        if let Some(route) = &row.route {
            codes.extend(route_token().find_iter(route).map(|m| m.as_str().to_string()));
        }
    }
    codes
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MapPanel {
    MissingLookup { caption: String },
    NoMatches { caption: String },
    Pins {
        pins: Vec<AirportCoordinate>,
        midpoint: GeoPoint,
        zoom: u8,
    },
}

impl MapPanel {
    pub fn build(lookup: Option<&[AirportCoordinate]>, lookup_name: &str, table: &DisplayTable) -> Self {
        let Some(airports) = lookup else {
            return MapPanel::MissingLookup {
                caption: format!("Add {lookup_name} (columns: iata,lat,lon) to enable the map."),
            };
        };

        let codes = referenced_codes(table);
        let pins: Vec<AirportCoordinate> = airports
            .iter()
            .filter(|a| codes.contains(&a.iata))
            .cloned()
            .collect();
        if pins.is_empty() {
            return MapPanel::NoMatches {
                caption: format!("No matching airports from current results found in {lookup_name}."),
            };
        }

        let n = pins.len() as f64;
        let midpoint = GeoPoint {
            latitude: pins.iter().map(|p| p.lat).sum::<f64>() / n,
            longitude: pins.iter().map(|p| p.lon).sum::<f64>() / n,
        };
        let zoom = if pins.len() == 1 { 8 } else { 3 };
        MapPanel::Pins { pins, midpoint, zoom }
    }
}

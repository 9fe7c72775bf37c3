use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{info, warn};

use crate::error::Result;
use crate::recommender::{RecommendObjective, RecommendRequest, Recommender};
use crate::reshape::layover_minutes;
use crate::types::{FlightLeg, Itinerary, MilesField, ResultSet, RouteRow, RouteType};
use crate::view::{asc, desc};

/// Table the adapter reads. Synthetic rows are expected to be prebuilt.
pub const ROUTES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS routes (
    date TEXT NOT NULL,
    type TEXT NOT NULL,
    origin TEXT NOT NULL,
    destination TEXT NOT NULL,
    airline TEXT,
    price REAL,
    miles INTEGER,
    taxes REAL,
    value_per_mile_cents REAL,
    flights_json TEXT,
    route TEXT
)
"#;

const SELECT_ROUTES: &str = r#"
SELECT date, type, origin, destination, airline,
       CAST(price AS REAL) AS price,
       CAST(miles AS TEXT) AS miles,
       CAST(taxes AS REAL) AS taxes,
       CAST(value_per_mile_cents AS REAL) AS value_per_mile_cents,
       flights_json, route
FROM routes
WHERE origin = ? AND destination = ? AND date BETWEEN ? AND ?
ORDER BY date, rowid
"#;

/// Reads prepared rows from the `routes` table of the request's database.
/// Opens the file read-only for each call; nothing is held between searches.
#[derive(Debug, Default, Clone)]
pub struct SqliteRecommender;

impl SqliteRecommender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Recommender for SqliteRecommender {
    async fn recommend_routes(&self, request: &RecommendRequest) -> Result<ResultSet> {
        let options = SqliteConnectOptions::new()
            .filename(&request.db_path)
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let records = sqlx::query(SELECT_ROUTES)
            .bind(&request.origin)
            .bind(&request.destination)
            .bind(request.start_date.to_string())
            .bind(request.end_date.to_string())
            .fetch_all(&pool)
            .await;
        pool.close().await;
        let records = records?;

        let candidates = records.len();
        let mut rows = records
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>>>()?;
        rows.retain(|row| keep(row, request));
        rank(&mut rows, request.objective);
        rows.truncate(request.max_results as usize);

        info!(
            origin = %request.origin,
            destination = %request.destination,
            candidates,
            returned = rows.len(),
            "routes recommended"
        );
        Ok(rows)
    }
}

fn decode_row(record: &SqliteRow) -> Result<RouteRow> {
    let kind: Option<String> = record.try_get("type")?;
    let route_type = match kind.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("direct") => Some(RouteType::Direct),
        Some("synthetic") => Some(RouteType::Synthetic),
        Some(other) => {
            warn!(route_type = other, "unknown route type");
            None
        }
        None => None,
    };

    let raw_legs: Option<String> = record.try_get("flights_json")?;
    let flights_json = match raw_legs {
        Some(raw) if !raw.trim().is_empty() => match serde_json::from_str::<Vec<FlightLeg>>(&raw) {
            Ok(legs) => Some(legs),
            Err(e) => {
                warn!("malformed flights_json, row kept without legs: {e}");
                None
            }
        },
        _ => None,
    };

    let miles: Option<String> = record.try_get("miles")?;

    Ok(RouteRow {
        date: record.try_get("date")?,
        route_type,
        origin: record.try_get("origin")?,
        destination: record.try_get("destination")?,
        airline: record.try_get("airline")?,
        price: record.try_get("price")?,
        miles: miles.map(MilesField::Text),
        taxes: record.try_get("taxes")?,
        value_per_mile_cents: record.try_get("value_per_mile_cents")?,
        flights_json,
        route: record.try_get("route")?,
    })
}

fn airline_allowed(row: &RouteRow, allowlist: &[String]) -> bool {
    let allowed = |name: &str| allowlist.iter().any(|a| a.eq_ignore_ascii_case(name.trim()));
    let leg_airlines: Vec<&str> = row
        .flights_json
        .iter()
        .flatten()
        .filter_map(|leg| leg.airline.as_deref())
        .collect();
    if leg_airlines.is_empty() {
        row.airline.as_deref().is_some_and(allowed)
    } else {
        leg_airlines.into_iter().all(allowed)
    }
}

fn keep(row: &RouteRow, request: &RecommendRequest) -> bool {
    if row.route_type == Some(RouteType::Synthetic) {
        if !request.include_synthetic {
            return false;
        }
        if let Itinerary::Connecting(first, second) = row.itinerary() {
            if let Some(minutes) = layover_minutes(first, second) {
                if minutes < i64::from(request.min_layover_minutes) {
                    return false;
                }
            }
        }
    }
    if let Some(min) = request.min_vpm_cents {
        if !row.value_per_mile_cents.is_some_and(|v| v >= min) {
            return false;
        }
    }
    if let Some(max) = request.max_price {
        if !row.price.is_some_and(|p| p <= max) {
            return false;
        }
    }
    match &request.airline_allowlist {
        Some(list) => airline_allowed(row, list),
        None => true,
    }
}

fn rank(rows: &mut [RouteRow], objective: RecommendObjective) {
    rows.sort_by(|a, b| match objective {
        RecommendObjective::Vpm => desc(a.value_per_mile_cents, b.value_per_mile_cents)
            .then_with(|| asc(a.price, b.price)),
        RecommendObjective::Price => asc(a.price, b.price)
            .then_with(|| desc(a.value_per_mile_cents, b.value_per_mile_cents)),
    });
}

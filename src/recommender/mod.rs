pub mod sqlite;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::types::{ResultSet, SearchParameters};

pub use sqlite::SqliteRecommender;

/// Ranking the recommender applies before truncating to `max_results`.
///
/// The dashboard always asks for `Vpm` and reorders the view itself. `Price`
/// is part of the request contract for other `Recommender` implementations;
/// `SqliteRecommender` honors both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendObjective {
    Vpm,
    Price,
}

/// Arguments in the shape the recommender expects. `None` means "no filter".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendRequest {
    pub origin: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub include_synthetic: bool,
    pub min_layover_minutes: u32,
    pub objective: RecommendObjective,
    pub min_vpm_cents: Option<f64>,
    pub max_price: Option<f64>,
    pub airline_allowlist: Option<Vec<String>>,
    pub max_results: u32,
    pub db_path: PathBuf,
}

impl RecommendRequest {
    /// Ranking is always by value per mile here; the dashboard applies the
    /// user's objective when it sorts the view.
    pub fn from_params(params: &SearchParameters, db_path: &Path) -> Self {
        let positive = |v: f64| (v > 0.0).then_some(v);
        let allowlist: Vec<String> = params
            .airline_allowlist
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        Self {
            origin: params.origin.code().to_string(),
            destination: params.destination.code().to_string(),
            start_date: params.start_date,
            end_date: params.end_date,
            include_synthetic: params.include_synthetic,
            min_layover_minutes: params.min_layover_minutes,
            objective: RecommendObjective::Vpm,
            min_vpm_cents: positive(params.min_vpm_cents),
            max_price: positive(params.max_price),
            airline_allowlist: (!allowlist.is_empty()).then_some(allowlist),
            max_results: params.max_results,
            db_path: db_path.to_path_buf(),
        }
    }
}

/// The route search the dashboard delegates to.
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend_routes(&self, request: &RecommendRequest) -> Result<ResultSet>;
}

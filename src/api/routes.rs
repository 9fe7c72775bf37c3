use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::health::HealthReport;
use crate::api::page::{landing_page, read_stylesheet};
use crate::dashboard::{Action, Dashboard, Page, RenderRequest, ViewContent};
use crate::error::AppError;
use crate::export::to_csv_bytes;
use crate::state::latency::LatencySnapshot;
use crate::state::{MemorySession, SessionId, SessionRegistry};
use crate::types::{parse_allowlist, Airport, Objective, SearchParameters};

#[derive(Clone)]
pub struct ApiState {
    pub dashboard: Arc<Dashboard>,
    pub sessions: Arc<SessionRegistry>,
    pub stylesheet_path: PathBuf,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(get_landing))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", delete(end_session))
        .route("/sessions/:id/view", get(get_view))
        .route("/sessions/:id/export.csv", get(get_export))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

/// Sidebar controls. Anything omitted falls back to the session defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ControlsQuery {
    pub origin: Option<Airport>,
    pub destination: Option<Airport>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub include_synthetic: Option<bool>,
    pub min_layover_minutes: Option<u32>,
    pub objective: Option<Objective>,
    pub min_vpm_cents: Option<f64>,
    pub max_price: Option<f64>,
    /// Comma-separated airline names.
    pub airlines: Option<String>,
    pub miles_balance: Option<u64>,
    pub max_results: Option<u32>,
    #[serde(default)]
    pub search: bool,
    #[serde(default)]
    pub only_within: bool,
}

impl ControlsQuery {
    pub fn into_request(self, dashboard: &Dashboard) -> RenderRequest {
        let mut params = SearchParameters::defaults(dashboard.coverage());
        if let Some(v) = self.origin {
            params.origin = v;
        }
        if let Some(v) = self.destination {
            params.destination = v;
        }
        if let Some(v) = self.start_date {
            params.start_date = v;
        }
        if let Some(v) = self.end_date {
            params.end_date = v;
        }
        if let Some(v) = self.include_synthetic {
            params.include_synthetic = v;
        }
        if let Some(v) = self.min_layover_minutes {
            params.min_layover_minutes = v;
        }
        if let Some(v) = self.objective {
            params.objective = v;
        }
        if let Some(v) = self.min_vpm_cents {
            params.min_vpm_cents = v;
        }
        if let Some(v) = self.max_price {
            params.max_price = v;
        }
        if let Some(text) = &self.airlines {
            params.airline_allowlist = parse_allowlist(text);
        }
        if let Some(v) = self.miles_balance {
            params.miles_balance = v;
        }
        if let Some(v) = self.max_results {
            params.max_results = v;
        }
        RenderRequest {
            params,
            action: if self.search { Action::Search } else { Action::Idle },
            only_within_budget: self.only_within,
        }
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct SessionCreated {
    pub id: SessionId,
    pub defaults: SearchParameters,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn lookup_session(state: &ApiState, raw: &str) -> Result<Arc<MemorySession>, AppError> {
    raw.parse::<SessionId>()
        .ok()
        .and_then(|id| state.sessions.get(id))
        .ok_or_else(|| AppError::SessionNotFound(raw.to_string()))
}

async fn get_landing(State(state): State<ApiState>) -> Html<String> {
    let css = read_stylesheet(&state.stylesheet_path);
    Html(landing_page(css.as_deref()))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthReport> {
    Json(HealthReport::collect(
        &state.sessions,
        state.dashboard.db_path(),
        state.dashboard.airports_path(),
    ))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySnapshot> {
    Json(state.dashboard.latency().snapshot())
}

async fn create_session(State(state): State<ApiState>) -> impl IntoResponse {
    let (id, _) = state.sessions.start();
    let body = SessionCreated {
        id,
        defaults: SearchParameters::defaults(state.dashboard.coverage()),
    };
    (StatusCode::CREATED, Json(body))
}

async fn end_session(
    State(state): State<ApiState>,
    Path(raw): Path<String>,
) -> Result<StatusCode, AppError> {
    let ended = raw
        .parse::<SessionId>()
        .map(|id| state.sessions.end(id))
        .unwrap_or(false);
    if ended {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::SessionNotFound(raw))
    }
}

async fn get_view(
    State(state): State<ApiState>,
    Path(raw): Path<String>,
    Query(controls): Query<ControlsQuery>,
) -> Result<Json<Page>, AppError> {
    let session = lookup_session(&state, &raw)?;
    let request = controls.into_request(&state.dashboard);
    let page = state.dashboard.render_page(&request, &*session).await;
    Ok(Json(page))
}

/// CSV of the current view, built from cached results only.
async fn get_export(
    State(state): State<ApiState>,
    Path(raw): Path<String>,
    Query(controls): Query<ControlsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let session = lookup_session(&state, &raw)?;
    let mut request = controls.into_request(&state.dashboard);
    request.action = Action::Idle;

    let view = state.dashboard.render(&request, &*session).await?;
    let ViewContent::Results(results) = view.content else {
        return Err(AppError::InvalidParameter("no results to export".to_string()));
    };
    let body = to_csv_bytes(&results.table)?;
    info!(session = %raw, file = %results.export_name, rows = results.table.len(), "csv export served");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", results.export_name),
            ),
        ],
        body,
    ))
}

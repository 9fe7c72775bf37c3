use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::airports::{load_airports, MapPanel};
use crate::config::{Config, DataCoverage, RESULTS_KEY};
use crate::error::{RenderFailure, Result};
use crate::export::export_file_name;
use crate::recommender::{RecommendRequest, Recommender};
use crate::reshape::DisplayTable;
use crate::state::{LatencyStats, SessionStore};
use crate::summary::Summary;
use crate::types::{Objective, SearchParameters};
use crate::validation::{validate, Message, Validation};
use crate::view::{apply_budget, sort_view, BudgetToggle};

/// What triggered a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Any interaction other than the search button: reuse cached results.
    #[default]
    Idle,
    Search,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub params: SearchParameters,
    pub action: Action,
    pub only_within_budget: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsView {
    pub objective: Objective,
    pub table: DisplayTable,
    pub budget: BudgetToggle,
    pub map: MapPanel,
    pub summary: Summary,
    pub export_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewContent {
    NoResults,
    Results(ResultsView),
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub messages: Vec<Message>,
    pub search_enabled: bool,
    pub content: ViewContent,
}

impl DashboardView {
    pub fn results(&self) -> Option<&ResultsView> {
        match &self.content {
            ViewContent::Results(r) => Some(r),
            ViewContent::NoResults => None,
        }
    }
}

/// Outcome of one top-to-bottom render, failures included.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum Page {
    Ready(DashboardView),
    Failed(RenderFailure),
}

/// The render controller shared by the terminal dashboard and the HTTP server.
pub struct Dashboard {
    recommender: Arc<dyn Recommender>,
    coverage: DataCoverage,
    db_path: PathBuf,
    airports_path: PathBuf,
    latency: Arc<LatencyStats>,
}

impl Dashboard {
    pub fn new(
        recommender: Arc<dyn Recommender>,
        coverage: DataCoverage,
        db_path: impl Into<PathBuf>,
        airports_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            recommender,
            coverage,
            db_path: db_path.into(),
            airports_path: airports_path.into(),
            latency: Arc::new(LatencyStats::new()),
        }
    }

    pub fn from_config(cfg: &Config, recommender: Arc<dyn Recommender>) -> Self {
        Self::new(
            recommender,
            DataCoverage::default(),
            &cfg.db_path,
            &cfg.airports_path,
        )
    }

    pub fn coverage(&self) -> &DataCoverage {
        &self.coverage
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn airports_path(&self) -> &Path {
        &self.airports_path
    }

    pub fn latency(&self) -> &Arc<LatencyStats> {
        &self.latency
    }

    /// Render and capture any failure as a displayable page.
    pub async fn render_page(&self, request: &RenderRequest, session: &dyn SessionStore) -> Page {
        match self.render(request, session).await {
            Ok(view) => Page::Ready(view),
            Err(e) => {
                tracing::error!("render failed: {e}");
                Page::Failed(RenderFailure::from_error(&e))
            }
        }
    }

    /// Validate controls as a render would see them, clamped first.
    pub fn validate(&self, params: &SearchParameters) -> Validation {
        validate(&params.clone().clamped(), &self.coverage, &self.db_path)
    }

    pub async fn render(&self, request: &RenderRequest, session: &dyn SessionStore) -> Result<DashboardView> {
        let params = request.params.clone().clamped();
        let validation = validate(&params, &self.coverage, &self.db_path);
        let search_enabled = validation.search_enabled();
        let mut messages = validation.messages;

        if !search_enabled {
            if request.action == Action::Search {
                info!(origin = %params.origin, destination = %params.destination, "search blocked by validation");
            }
            return Ok(DashboardView { messages, search_enabled, content: ViewContent::NoResults });
        }

        let results = match request.action {
            Action::Search => {
                let rec_request = RecommendRequest::from_params(&params, &self.db_path);
                let started = Instant::now();
                let rows = self.recommender.recommend_routes(&rec_request).await?;
                self.latency.record(started.elapsed());
                info!(
                    origin = %params.origin,
                    destination = %params.destination,
                    start = %params.start_date,
                    end = %params.end_date,
                    rows = rows.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "search complete"
                );
                session.set(RESULTS_KEY, rows);
                session.get(RESULTS_KEY)
            }
            Action::Idle => {
                let cached = session.get(RESULTS_KEY);
                debug!(cached = cached.as_ref().map(|r| r.len()), "reusing cached results");
                cached
            }
        };

        let Some(results) = results.filter(|r| !r.is_empty()) else {
            return Ok(DashboardView { messages, search_enabled, content: ViewContent::NoResults });
        };

        let table = DisplayTable::reshape(&results);
        let budget = apply_budget(table, params.miles_balance, request.only_within_budget);
        messages.extend(budget.notice);
        let table = sort_view(budget.table, params.objective);

        let airports = load_airports(&self.airports_path)?;
        let lookup_name = self
            .airports_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.airports_path.display().to_string());
        let map = MapPanel::build(airports.as_deref(), &lookup_name, &table);
        let summary = Summary::build(&table);

        Ok(DashboardView {
            messages,
            search_enabled,
            content: ViewContent::Results(ResultsView {
                objective: params.objective,
                table,
                budget: budget.toggle,
                map,
                summary,
                export_name: export_file_name(&params),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::recommender::RecommendObjective;
    use crate::state::MemorySession;
    use crate::types::{Airport, MilesField, ResultSet, RouteRow, RouteType};
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns canned rows and remembers what it was asked.
    #[derive(Default)]
    struct StubRecommender {
        rows: ResultSet,
        calls: AtomicUsize,
        last: Mutex<Option<RecommendRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl Recommender for StubRecommender {
        async fn recommend_routes(&self, request: &RecommendRequest) -> Result<ResultSet> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request.clone());
            if self.fail {
                return Err(AppError::Recommender("routes table missing".to_string()));
            }
            Ok(self.rows.clone())
        }
    }

    fn row(kind: RouteType, price: f64, taxes: f64, vpm: f64, miles: f64) -> RouteRow {
        RouteRow {
            date: Some("2025-08-15".into()),
            route_type: Some(kind),
            origin: Some("LAX".into()),
            destination: Some("JFK".into()),
            airline: Some("Delta".into()),
            price: Some(price),
            taxes: Some(taxes),
            miles: Some(MilesField::Number(miles)),
            value_per_mile_cents: Some(vpm),
            route: Some("LAX → JFK".into()),
            ..RouteRow::default()
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        stub: Arc<StubRecommender>,
        dashboard: Dashboard,
    }

    fn fixture(stub: StubRecommender) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("routes.db");
        std::fs::write(&db, b"").unwrap();
        let stub = Arc::new(stub);
        let dashboard = Dashboard::new(
            stub.clone(),
            DataCoverage::august_2025(),
            db,
            dir.path().join("airports.csv"),
        );
        Fixture { dir, stub, dashboard }
    }

    fn request(action: Action) -> RenderRequest {
        RenderRequest {
            params: SearchParameters::defaults(&DataCoverage::august_2025()),
            action,
            only_within_budget: false,
        }
    }

    fn sample_rows() -> ResultSet {
        vec![
            row(RouteType::Direct, 200.0, 20.0, 1.5, 30000.0),
            row(RouteType::Direct, 150.0, 10.0, 1.0, 15000.0),
            row(RouteType::Synthetic, 150.0, 10.0, 2.0, 12000.0),
        ]
    }

    #[tokio::test]
    async fn idle_without_cache_shows_no_results() {
        let f = fixture(StubRecommender { rows: sample_rows(), ..Default::default() });
        let session = MemorySession::new();
        let view = f.dashboard.render(&request(Action::Idle), &session).await.unwrap();
        assert!(view.search_enabled);
        assert!(matches!(view.content, ViewContent::NoResults));
        assert_eq!(f.stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn search_caches_and_idle_reuses() {
        let f = fixture(StubRecommender { rows: sample_rows(), ..Default::default() });
        let session = MemorySession::new();

        let view = f.dashboard.render(&request(Action::Search), &session).await.unwrap();
        assert_eq!(view.results().unwrap().table.len(), 3);
        assert_eq!(f.stub.calls.load(Ordering::SeqCst), 1);

        let mut toggled = request(Action::Idle);
        toggled.params.objective = Objective::MinimumPrice;
        let view = f.dashboard.render(&toggled, &session).await.unwrap();
        let results = view.results().unwrap();
        assert_eq!(f.stub.calls.load(Ordering::SeqCst), 1, "idle render must not search");
        let vpms: Vec<_> = results.table.rows.iter().map(|r| r.value_per_mile.unwrap()).collect();
        assert_eq!(vpms, vec![2.0, 1.0, 1.5]);

        // the cached result set keeps the recommender's order
        let cached = session.get(RESULTS_KEY).unwrap();
        assert_eq!(cached[0].value_per_mile_cents, Some(1.5));
    }

    #[tokio::test]
    async fn recommender_always_ranks_by_vpm() {
        let f = fixture(StubRecommender::default());
        let session = MemorySession::new();
        let mut req = request(Action::Search);
        req.params.objective = Objective::MinimumPrice;
        f.dashboard.render(&req, &session).await.unwrap();
        let last = f.stub.last.lock().unwrap().clone().unwrap();
        assert_eq!(last.objective, RecommendObjective::Vpm);
        assert_eq!(last.airline_allowlist, None);
    }

    #[tokio::test]
    async fn errors_block_the_recommender() {
        let f = fixture(StubRecommender { rows: sample_rows(), ..Default::default() });
        let session = MemorySession::new();
        session.set(RESULTS_KEY, sample_rows());

        let mut req = request(Action::Search);
        req.params.origin = Airport::Dxb;
        req.params.destination = Airport::Lhr;
        let view = f.dashboard.render(&req, &session).await.unwrap();
        assert!(!view.search_enabled);
        assert!(matches!(view.content, ViewContent::NoResults));
        assert_eq!(f.stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_search_replaces_cache() {
        let f = fixture(StubRecommender::default());
        let session = MemorySession::new();
        session.set(RESULTS_KEY, sample_rows());
        let view = f.dashboard.render(&request(Action::Search), &session).await.unwrap();
        assert!(matches!(view.content, ViewContent::NoResults));
        assert_eq!(session.get(RESULTS_KEY).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn within_budget_request_with_no_matches_keeps_all_rows() {
        let f = fixture(StubRecommender { rows: sample_rows(), ..Default::default() });
        let session = MemorySession::new();
        let mut req = request(Action::Search);
        req.params.miles_balance = 1000;
        req.only_within_budget = true;
        let view = f.dashboard.render(&req, &session).await.unwrap();
        assert_eq!(view.results().unwrap().table.len(), 3);
        assert!(view
            .messages
            .iter()
            .any(|m| m.text == "No routes within 1,000 miles. Showing all results instead."));
    }

    #[tokio::test]
    async fn within_budget_restricts_view_only() {
        let f = fixture(StubRecommender { rows: sample_rows(), ..Default::default() });
        let session = MemorySession::new();
        let mut req = request(Action::Search);
        req.params.miles_balance = 20000;
        req.only_within_budget = true;
        let view = f.dashboard.render(&req, &session).await.unwrap();
        let results = view.results().unwrap();
        assert_eq!(results.table.len(), 2);
        assert!(matches!(results.budget, BudgetToggle::Enabled { matches: 2, .. }));
        assert_eq!(session.get(RESULTS_KEY).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn map_uses_airports_lookup_when_present() {
        let f = fixture(StubRecommender { rows: sample_rows(), ..Default::default() });
        let session = MemorySession::new();

        let view = f.dashboard.render(&request(Action::Search), &session).await.unwrap();
        assert!(matches!(view.results().unwrap().map, MapPanel::MissingLookup { .. }));

        let mut file = std::fs::File::create(f.dir.path().join("airports.csv")).unwrap();
        writeln!(file, "iata,lat,lon\nLAX,33.94,-118.41\nJFK,40.64,-73.78").unwrap();
        let view = f.dashboard.render(&request(Action::Idle), &session).await.unwrap();
        assert!(matches!(view.results().unwrap().map, MapPanel::Pins { zoom: 3, .. }));
    }

    #[tokio::test]
    async fn recommender_failure_becomes_failed_page() {
        let f = fixture(StubRecommender { fail: true, ..Default::default() });
        let session = MemorySession::new();
        match f.dashboard.render_page(&request(Action::Search), &session).await {
            Page::Failed(failure) => {
                assert!(failure.message.contains("routes table missing"));
                assert!(!failure.trace.is_empty());
            }
            Page::Ready(_) => panic!("expected a failed page"),
        }
        assert!(f.dashboard.validate(&request(Action::Search).params).search_enabled());
        // the session is still usable afterwards
        let page = f.dashboard.render_page(&request(Action::Idle), &session).await;
        assert!(matches!(page, Page::Ready(_)));
    }

    #[tokio::test]
    async fn search_latency_is_recorded() {
        let f = fixture(StubRecommender { rows: sample_rows(), ..Default::default() });
        let session = MemorySession::new();
        f.dashboard.render(&request(Action::Search), &session).await.unwrap();
        assert_eq!(f.dashboard.latency().snapshot().sample_count, 1);
    }
}

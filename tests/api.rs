use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use redemption_dashboard::api::{router, ApiState};
use redemption_dashboard::config::DataCoverage;
use redemption_dashboard::dashboard::Dashboard;
use redemption_dashboard::error::Result;
use redemption_dashboard::recommender::{RecommendRequest, Recommender};
use redemption_dashboard::state::SessionRegistry;
use redemption_dashboard::types::{MilesField, ResultSet, RouteRow, RouteType};

#[derive(Default)]
struct CountingRecommender {
    calls: AtomicUsize,
}

fn route(kind: RouteType, airline: &str, price: f64, vpm: f64, miles: f64) -> RouteRow {
    RouteRow {
        date: Some("2025-08-15".into()),
        route_type: Some(kind),
        origin: Some("LAX".into()),
        destination: Some("JFK".into()),
        airline: Some(airline.into()),
        price: Some(price),
        taxes: Some(5.6),
        miles: Some(MilesField::Number(miles)),
        value_per_mile_cents: Some(vpm),
        route: Some("LAX → JFK".into()),
        ..RouteRow::default()
    }
}

#[async_trait]
impl Recommender for CountingRecommender {
    async fn recommend_routes(&self, _request: &RecommendRequest) -> Result<ResultSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            route(RouteType::Direct, "Delta", 320.0, 1.6, 20000.0),
            route(RouteType::Direct, "JetBlue", 180.0, 1.2, 15000.0),
        ])
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    app: Router,
    recommender: Arc<CountingRecommender>,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("routes.db");
    std::fs::write(&db, b"").unwrap();
    std::fs::write(dir.path().join("style.css"), ".hero { margin: 0; }").unwrap();

    let recommender = Arc::new(CountingRecommender::default());
    let dashboard = Dashboard::new(
        recommender.clone(),
        DataCoverage::august_2025(),
        db,
        dir.path().join("airports.csv"),
    );
    let app = router(ApiState {
        dashboard: Arc::new(dashboard),
        sessions: SessionRegistry::new(),
        stylesheet_path: dir.path().join("style.css"),
    });
    Harness { _dir: dir, app, recommender }
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn json(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(app, method, uri).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn start_session(app: &Router) -> u64 {
    let (status, body) = json(app, Method::POST, "/sessions").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["defaults"]["origin"], "LAX");
    body["id"].as_u64().unwrap()
}

#[tokio::test]
async fn search_then_resort_without_searching_again() {
    let h = harness();
    let id = start_session(&h.app).await;

    let (status, page) = json(&h.app, Method::GET, &format!("/sessions/{id}/view")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], "ready");
    assert_eq!(page["content"]["state"], "no_results");

    let (_, page) = json(&h.app, Method::GET, &format!("/sessions/{id}/view?search=true")).await;
    assert_eq!(page["content"]["state"], "results");
    let rows = page["content"]["table"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][4], "Delta");
    assert_eq!(h.recommender.calls.load(Ordering::SeqCst), 1);

    let (_, page) = json(
        &h.app,
        Method::GET,
        &format!("/sessions/{id}/view?objective=minimum_price"),
    )
    .await;
    let rows = page["content"]["table"]["rows"].as_array().unwrap();
    assert_eq!(rows[0][4], "JetBlue");
    assert_eq!(h.recommender.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn validation_errors_block_search() {
    let h = harness();
    let id = start_session(&h.app).await;

    let (status, page) = json(
        &h.app,
        Method::GET,
        &format!("/sessions/{id}/view?origin=LHR&destination=JFK&search=true"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["search_enabled"], false);
    assert_eq!(page["messages"][0]["severity"], "error");
    assert_eq!(page["messages"][0]["text"], "Route LHR → JFK does not exist in the database.");
    assert_eq!(h.recommender.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn query_outside_airport_choices_is_rejected() {
    let h = harness();
    let id = start_session(&h.app).await;

    let (status, page) = json(
        &h.app,
        Method::GET,
        &format!("/sessions/{id}/view?destination=LAX&search=true"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["search_enabled"], false);
    assert_eq!(page["messages"][0]["text"], "LAX is not an available destination.");
    assert_eq!(page["content"]["state"], "no_results");
    assert_eq!(h.recommender.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn export_names_file_after_route_and_dates() {
    let h = harness();
    let id = start_session(&h.app).await;

    let (status, _, _) = send(&h.app, Method::GET, &format!("/sessions/{id}/export.csv")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    json(&h.app, Method::GET, &format!("/sessions/{id}/view?search=true")).await;
    let (status, headers, body) = send(&h.app, Method::GET, &format!("/sessions/{id}/export.csv")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"recommendations_LAX_JFK_2025-08-15_2025-08-15.csv\""
    );
    let text = String::from_utf8(body).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().next().unwrap().starts_with("date,type,origin,destination,airline"));
    assert_eq!(h.recommender.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ended_session_is_gone() {
    let h = harness();
    let id = start_session(&h.app).await;

    let (status, _, _) = send(&h.app, Method::DELETE, &format!("/sessions/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&h.app, Method::GET, &format!("/sessions/{id}/view")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = send(&h.app, Method::DELETE, &format!("/sessions/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = send(&h.app, Method::GET, "/sessions/not-a-number/view").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn landing_page_and_health() {
    let h = harness();

    let (status, _, body) = send(&h.app, Method::GET, "/").await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<style>.hero { margin: 0; }</style>"));
    assert!(html.contains("Dataset Tips"));

    start_session(&h.app).await;
    let (status, health) = json(&h.app, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["active_sessions"], 1);
    assert_eq!(health["airports_lookup_present"], false);

    let (_, latency) = json(&h.app, Method::GET, "/stats/latency").await;
    assert_eq!(latency["sample_count"], 0);
}

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use redemption_dashboard::api::{router, ApiState};
use redemption_dashboard::config::Config;
use redemption_dashboard::dashboard::Dashboard;
use redemption_dashboard::error::Result;
use redemption_dashboard::recommender::SqliteRecommender;
use redemption_dashboard::state::SessionRegistry;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Render controller ---
    let dashboard = Arc::new(Dashboard::from_config(&cfg, Arc::new(SqliteRecommender::new())));
    if dashboard.db_path().exists() {
        info!("Route database at {}", cfg.db_path);
    } else {
        warn!("Route database {} not found; searches stay disabled until it exists", cfg.db_path);
    }
    info!(
        month = %dashboard.coverage().month_label(),
        airports = %cfg.airports_path,
        stylesheet = %cfg.stylesheet_path,
        "dashboard ready"
    );

    // --- HTTP server ---
    let state = ApiState {
        dashboard,
        sessions: SessionRegistry::new(),
        stylesheet_path: cfg.stylesheet_path.clone().into(),
    };
    let app = router(state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

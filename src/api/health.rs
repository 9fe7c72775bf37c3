//! Body of the /health endpoint.

use std::path::Path;

use serde::Serialize;

use crate::state::SessionRegistry;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub active_sessions: usize,
    /// Whether the route database is on disk; searches are blocked without it.
    pub database_present: bool,
    pub airports_lookup_present: bool,
}

impl HealthReport {
    pub fn collect(sessions: &SessionRegistry, db_path: &Path, airports_path: &Path) -> Self {
        let database_present = db_path.exists();
        Self {
            status: if database_present { "ok" } else { "degraded" },
            active_sessions: sessions.len(),
            database_present,
            airports_lookup_present: airports_path.exists(),
        }
    }
}

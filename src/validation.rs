use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::config::DataCoverage;
use crate::types::{Airport, SearchParameters};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks the search action.
    Error,
    /// Search proceeds; coverage may be thin.
    Warning,
    /// Advisory only.
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
}

impl Message {
    pub fn error(text: impl Into<String>) -> Self {
        Self { severity: Severity::Error, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, text: text.into() }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self { severity: Severity::Info, text: text.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Validation {
    pub messages: Vec<Message>,
}

impl Validation {
    pub fn search_enabled(&self) -> bool {
        !self.messages.iter().any(|m| m.severity == Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.messages.iter().filter(|m| m.severity == severity).count()
    }
}

/// Check one set of controls against what the dataset can answer.
pub fn validate(params: &SearchParameters, coverage: &DataCoverage, db_path: &Path) -> Validation {
    let mut messages = Vec::new();
    let month = coverage.month_label();

    if !coverage.contains(params.start_date) {
        messages.push(Message::error(format!("Start date must be in {month}.")));
    }
    if !coverage.contains(params.end_date) {
        messages.push(Message::error(format!("End date must be in {month}.")));
    }

    if coverage
        .missing_routes
        .contains(&(params.origin, params.destination))
    {
        messages.push(Message::error(format!(
            "Route {} → {} does not exist in the database.",
            params.origin, params.destination
        )));
    } else {
        if !Airport::ORIGINS.contains(&params.origin) {
            messages.push(Message::error(format!(
                "{} is not an available origin.",
                params.origin
            )));
        }
        if !Airport::DESTINATIONS.contains(&params.destination) {
            messages.push(Message::error(format!(
                "{} is not an available destination.",
                params.destination
            )));
        }
    }

    if !db_path.exists() {
        messages.push(Message::error(format!(
            "Database file '{}' not found.",
            db_path.display()
        )));
    }

    let last = coverage.last_day;
    if params.start_date <= last && last <= params.end_date && params.include_synthetic {
        messages.push(Message::info(format!(
            "{} has only direct flights; synthetic may return zero results.",
            last.format("%b %-d")
        )));
    }

    let (covered_from, covered_to) = coverage.well_covered;
    if params.destination == coverage.long_haul_hub
        && (params.end_date < covered_from || params.start_date > covered_to)
    {
        messages.push(Message::warning(format!(
            "For {} destination, use dates between {}–{} for best coverage.",
            coverage.long_haul_hub,
            covered_from.format("%b %-d"),
            covered_to.format("%-d"),
        )));
    }

    messages.sort_by_key(|m| m.severity);
    let validation = Validation { messages };
    debug!(
        errors = validation.count(Severity::Error),
        warnings = validation.count(Severity::Warning),
        infos = validation.count(Severity::Info),
        "validated search parameters"
    );
    validation
}

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use crate::reshape::{Column, DisplayRow, DisplayTable};
use crate::types::Objective;
use crate::validation::Message;

// ---------------------------------------------------------------------------
// Within-budget toggle
// ---------------------------------------------------------------------------

/// State of the "show only routes within my miles" control.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BudgetToggle {
    /// No balance entered, or no miles column to compare against.
    Hidden,
    Enabled { matches: usize, label: String },
    /// Nothing fits the balance; shown greyed out with a caption.
    Disabled { caption: String },
}

/// Result of restricting a table to the user's miles balance.
#[derive(Debug, Clone)]
pub struct BudgetView {
    pub table: DisplayTable,
    pub toggle: BudgetToggle,
    pub notice: Option<Message>,
}

fn with_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Mark rows whose miles fit `balance` and, when asked, keep only those.
/// The restriction never produces an empty view: with no matches the full
/// table comes back alongside an informational notice.
pub fn apply_budget(mut table: DisplayTable, balance: u64, only_within: bool) -> BudgetView {
    if balance == 0 || table.is_empty() || !table.has(Column::Miles) {
        return BudgetView { table, toggle: BudgetToggle::Hidden, notice: None };
    }

    let limit = balance as f64;
    for row in &mut table.rows {
        row.within_budget = Some(row.miles.is_some_and(|m| m <= limit));
    }
    table.add_column(Column::WithinBudget);

    let matches = table
        .rows
        .iter()
        .filter(|r| r.within_budget == Some(true))
        .count();
    let toggle = if matches > 0 {
        BudgetToggle::Enabled {
            matches,
            label: format!("Show only routes within my miles ({matches} found)"),
        }
    } else {
        BudgetToggle::Disabled {
            caption: format!(
                "No routes are within your miles balance ({}).",
                with_thousands(balance)
            ),
        }
    };
    debug!(balance, matches, only_within, "applied miles budget");

    if !only_within {
        return BudgetView { table, toggle, notice: None };
    }
    if matches == 0 {
        let notice = Message::info(format!(
            "No routes within {} miles. Showing all results instead.",
            with_thousands(balance)
        ));
        return BudgetView { table, toggle, notice: Some(notice) };
    }

    let rows = table
        .rows
        .iter()
        .filter(|r| r.within_budget == Some(true))
        .cloned()
        .collect();
    BudgetView { table: table.with_rows(rows), toggle, notice: None }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Ascending with missing values last.
pub(crate) fn asc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Descending with missing values last.
pub(crate) fn desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        _ => asc(a, b),
    }
}

/// Stable sort by the display objective. Rows sharing a key keep their order.
pub fn sort_rows(rows: &mut [DisplayRow], objective: Objective, with_taxes: bool) {
    match objective {
        Objective::MinimumPrice => rows.sort_by(|a, b| {
            asc(a.price, b.price)
                .then_with(|| {
                    if with_taxes {
                        asc(a.taxes, b.taxes)
                    } else {
                        Ordering::Equal
                    }
                })
                .then_with(|| desc(a.value_per_mile, b.value_per_mile))
        }),
        Objective::ValuePerMile => rows.sort_by(|a, b| {
            desc(a.value_per_mile, b.value_per_mile).then_with(|| asc(a.price, b.price))
        }),
    }
}

/// Order a view for display. Tables without both price and value-per-mile keep
/// the recommender's order.
pub fn sort_view(mut table: DisplayTable, objective: Objective) -> DisplayTable {
    if table.has(Column::ValuePerMile) && table.has(Column::Price) {
        let with_taxes = table.has(Column::Taxes);
        sort_rows(&mut table.rows, objective, with_taxes);
    }
    table
}

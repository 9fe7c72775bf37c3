use serde::Serialize;

use crate::config::TOP_CHART_BARS;
use crate::reshape::{Column, DisplayTable};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value_per_mile: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub miles: f64,
    pub price: f64,
}

/// Headline metrics and chart series for the current view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_routes: usize,
    pub best_value_per_mile: Option<f64>,
    /// Empty when the view has no value-per-mile column.
    pub top_by_value: Vec<Bar>,
    /// `None` unless price and miles both exist and the view has 2+ rows.
    pub price_vs_miles: Option<Vec<ScatterPoint>>,
}

impl Summary {
    pub fn build(table: &DisplayTable) -> Self {
        let has_vpm = table.has(Column::ValuePerMile);

        let best_value_per_mile = if has_vpm {
            table
                .rows
                .iter()
                .filter_map(|r| r.value_per_mile)
                .max_by(f64::total_cmp)
        } else {
            None
        };

        let top_by_value = if has_vpm {
            let mut ranked: Vec<_> = table
                .rows
                .iter()
                .filter_map(|r| r.value_per_mile.map(|v| (v, r)))
                .collect();
            // stable: equal values keep view order
            ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
            ranked
                .into_iter()
                .take(TOP_CHART_BARS)
                .map(|(value_per_mile, row)| Bar {
                    label: format!(
                        "{} • {} • {}",
                        row.cell(Column::Airline),
                        row.cell(Column::Date),
                        row.cell(Column::Type)
                    ),
                    value_per_mile,
                })
                .collect()
        } else {
            Vec::new()
        };

        let price_vs_miles = if table.has(Column::Price) && table.has(Column::Miles) && table.len() > 1 {
            Some(
                table
                    .rows
                    .iter()
                    .filter_map(|r| Some(ScatterPoint { miles: r.miles?, price: r.price? }))
                    .collect(),
            )
        } else {
            None
        };

        Self {
            total_routes: table.len(),
            best_value_per_mile,
            top_by_value,
            price_vs_miles,
        }
    }
}

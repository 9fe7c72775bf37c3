use serde::Serialize;

use crate::reshape::legs::LegColumns;
use crate::types::{MilesField, ResultSet, RouteRow, RouteType};

/// Display columns, declared in the order the table shows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Column {
    Date,
    Type,
    Origin,
    Destination,
    Airline,
    Price,
    Miles,
    Taxes,
    ValuePerMile,
    EstimatedSaved,
    Route,
    Layover,
    Leg1Flight,
    Leg1Departs,
    Leg1Arrives,
    Leg2Flight,
    Leg2Departs,
    Leg2Arrives,
    WithinBudget,
}

impl Column {
    pub const PREFERRED: [Column; 19] = [
        Column::Date,
        Column::Type,
        Column::Origin,
        Column::Destination,
        Column::Airline,
        Column::Price,
        Column::Miles,
        Column::Taxes,
        Column::ValuePerMile,
        Column::EstimatedSaved,
        Column::Route,
        Column::Layover,
        Column::Leg1Flight,
        Column::Leg1Departs,
        Column::Leg1Arrives,
        Column::Leg2Flight,
        Column::Leg2Departs,
        Column::Leg2Arrives,
        Column::WithinBudget,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Type => "type",
            Column::Origin => "origin",
            Column::Destination => "destination",
            Column::Airline => "airline",
            Column::Price => "price",
            Column::Miles => "miles",
            Column::Taxes => "taxes",
            Column::ValuePerMile => "Value per Mile (¢)",
            Column::EstimatedSaved => "Estimated $ Saved",
            Column::Route => "route",
            Column::Layover => "Layover (min)",
            Column::Leg1Flight => "Leg 1 Flight",
            Column::Leg1Departs => "Leg 1 Departs",
            Column::Leg1Arrives => "Leg 1 Arrives",
            Column::Leg2Flight => "Leg 2 Flight",
            Column::Leg2Departs => "Leg 2 Departs",
            Column::Leg2Arrives => "Leg 2 Arrives",
            Column::WithinBudget => "Within Your Miles?",
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One display-ready row. Text columns left blank by the recommender stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayRow {
    pub date: Option<String>,
    pub route_type: Option<RouteType>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub airline: Option<String>,
    pub price: Option<f64>,
    pub miles: Option<f64>,
    pub taxes: Option<f64>,
    pub value_per_mile: Option<f64>,
    pub estimated_saved: Option<f64>,
    pub route: Option<String>,
    pub legs: LegColumns,
    pub within_budget: Option<bool>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn number_cell(v: Option<f64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

impl DisplayRow {
    fn from_route(row: &RouteRow, with_savings: bool) -> Self {
        let estimated_saved = if with_savings {
            match (row.price, row.taxes) {
                (Some(price), Some(taxes)) => Some(round2((price - taxes).max(0.0))),
                _ => None,
            }
        } else {
            None
        };

        Self {
            date: row.date.clone(),
            route_type: row.route_type,
            origin: row.origin.clone(),
            destination: row.destination.clone(),
            airline: row.airline.clone(),
            price: row.price,
            miles: row.miles.as_ref().and_then(MilesField::coerce),
            taxes: row.taxes,
            value_per_mile: row.value_per_mile_cents,
            estimated_saved,
            route: row.route.clone(),
            legs: LegColumns::flatten(&row.itinerary()),
            within_budget: None,
        }
    }

    /// Cell text as written to CSV and the JSON table.
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::Date => self.date.clone().unwrap_or_default(),
            Column::Type => self.route_type.map(|t| t.to_string()).unwrap_or_default(),
            Column::Origin => self.origin.clone().unwrap_or_default(),
            Column::Destination => self.destination.clone().unwrap_or_default(),
            Column::Airline => self.airline.clone().unwrap_or_default(),
            Column::Price => number_cell(self.price),
            Column::Miles => number_cell(self.miles),
            Column::Taxes => number_cell(self.taxes),
            Column::ValuePerMile => number_cell(self.value_per_mile),
            Column::EstimatedSaved => number_cell(self.estimated_saved),
            Column::Route => self.route.clone().unwrap_or_default(),
            Column::Layover => self
                .legs
                .layover_minutes
                .map(|m| m.to_string())
                .unwrap_or_default(),
            Column::Leg1Flight => self.legs.leg1_flight.clone(),
            Column::Leg1Departs => self.legs.leg1_departs.clone(),
            Column::Leg1Arrives => self.legs.leg1_arrives.clone(),
            Column::Leg2Flight => self.legs.leg2_flight.clone(),
            Column::Leg2Departs => self.legs.leg2_departs.clone(),
            Column::Leg2Arrives => self.legs.leg2_arrives.clone(),
            Column::WithinBudget => match self.within_budget {
                Some(true) => "True".to_string(),
                Some(false) => "False".to_string(),
                None => String::new(),
            },
        }
    }
}

/// Display-ready rows plus the set of columns that exist for them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayTable {
    columns: Vec<Column>,
    pub rows: Vec<DisplayRow>,
}

impl DisplayTable {
    /// Rename, derive and flatten a recommender result. Pure: the input is untouched.
    pub fn reshape(results: &ResultSet) -> Self {
        let any = |f: fn(&RouteRow) -> bool| results.iter().any(f);

        let mut table = DisplayTable::default();
        let present = [
            (Column::Date, any(|r| r.date.is_some())),
            (Column::Type, any(|r| r.route_type.is_some())),
            (Column::Origin, any(|r| r.origin.is_some())),
            (Column::Destination, any(|r| r.destination.is_some())),
            (Column::Airline, any(|r| r.airline.is_some())),
            (Column::Price, any(|r| r.price.is_some())),
            (Column::Miles, any(|r| r.miles.is_some())),
            (Column::Taxes, any(|r| r.taxes.is_some())),
            (Column::ValuePerMile, any(|r| r.value_per_mile_cents.is_some())),
            (Column::Route, any(|r| r.route.is_some())),
        ];
        for (column, is_present) in present {
            if is_present {
                table.add_column(column);
            }
        }

        let with_savings = table.has(Column::Price) && table.has(Column::Taxes);
        if with_savings {
            table.add_column(Column::EstimatedSaved);
        }
        for column in [
            Column::Layover,
            Column::Leg1Flight,
            Column::Leg1Departs,
            Column::Leg1Arrives,
            Column::Leg2Flight,
            Column::Leg2Departs,
            Column::Leg2Arrives,
        ] {
            table.add_column(column);
        }

        table.rows = results
            .iter()
            .map(|r| DisplayRow::from_route(r, with_savings))
            .collect();
        table
    }

    /// Add a column unless it already exists. Keeps display order.
    pub fn add_column(&mut self, column: Column) {
        if let Err(pos) = self.columns.binary_search(&column) {
            self.columns.insert(pos, column);
        }
    }

    pub fn has(&self, column: Column) -> bool {
        self.columns.binary_search(&column).is_ok()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Same columns, a different selection of rows.
    pub fn with_rows(&self, rows: Vec<DisplayRow>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Every row as cell text, in column order.
    pub fn cells(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().map(|c| row.cell(*c)).collect())
            .collect()
    }
}

/// Serialized as `{ "columns": [labels], "rows": [[cells]] }`.
impl Serialize for DisplayTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let labels: Vec<&str> = self.columns.iter().map(|c| c.label()).collect();
        let mut s = serializer.serialize_struct("DisplayTable", 2)?;
        s.serialize_field("columns", &labels)?;
        s.serialize_field("rows", &self.cells())?;
        s.end()
    }
}

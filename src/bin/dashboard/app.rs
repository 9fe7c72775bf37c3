use chrono::Duration;
use ratatui::widgets::TableState;

use redemption_dashboard::config::{DataCoverage, MAX_LAYOVER_MINUTES, MAX_RESULTS_LIMIT};
use redemption_dashboard::dashboard::{Action, DashboardView, Page, RenderRequest};
use redemption_dashboard::types::{parse_allowlist, Airport, Objective, SearchParameters};
use redemption_dashboard::validation::Validation;

// ---------------------------------------------------------------------------
// Sidebar controls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Origin,
    Destination,
    StartDate,
    EndDate,
    IncludeSynthetic,
    MinLayover,
    Objective,
    MinVpm,
    MaxPrice,
    Airlines,
    MilesBalance,
    MaxResults,
}

impl Control {
    pub const ALL: [Control; 12] = [
        Control::Origin,
        Control::Destination,
        Control::StartDate,
        Control::EndDate,
        Control::IncludeSynthetic,
        Control::MinLayover,
        Control::Objective,
        Control::MinVpm,
        Control::MaxPrice,
        Control::Airlines,
        Control::MilesBalance,
        Control::MaxResults,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Control::Origin => "Origin Airport",
            Control::Destination => "Destination Airport",
            Control::StartDate => "Start Date",
            Control::EndDate => "End Date",
            Control::IncludeSynthetic => "Include Synthetic Routes",
            Control::MinLayover => "Minimum Layover (min)",
            Control::Objective => "Objective",
            Control::MinVpm => "Min Value per Mile (¢)",
            Control::MaxPrice => "Maximum Price ($)",
            Control::Airlines => "Allowed Airlines",
            Control::MilesBalance => "Your Miles Balance",
            Control::MaxResults => "Maximum Results",
        }
    }
}

const LAYOVER_STEP: i64 = 5;
const VPM_STEP: f64 = 0.1;
const PRICE_STEP: f64 = 10.0;
const MILES_STEP: i64 = 1000;
const RESULTS_STEP: i64 = 10;
const PAGE_ROWS: usize = 10;

fn cycle(options: &[Airport], current: Airport, delta: i32) -> Airport {
    let n = options.len() as i32;
    let i = options.iter().position(|a| *a == current).unwrap_or(0) as i32;
    options[(i + delta).rem_euclid(n) as usize]
}

fn step_int(value: i64, delta: i32, step: i64, min: i64, max: i64) -> i64 {
    (value + delta as i64 * step).clamp(min, max)
}

fn step_float(value: f64, delta: i32, step: f64) -> f64 {
    let next = value + delta as f64 * step;
    // keep one decimal so repeated steps don't drift
    ((next * 10.0).round() / 10.0).max(0.0)
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

pub struct App {
    pub coverage: DataCoverage,
    pub params: SearchParameters,
    pub airlines_text: String,
    pub focus: usize,
    pub only_within: bool,
    pub page: Option<Page>,
    pub validation: Option<Validation>,
    pub status: Option<String>,
    pub table_state: TableState,
}

impl App {
    pub fn new(coverage: DataCoverage) -> Self {
        let params = SearchParameters::defaults(&coverage);
        Self {
            coverage,
            params,
            airlines_text: String::new(),
            focus: 0,
            only_within: false,
            page: None,
            validation: None,
            status: None,
            table_state: TableState::default(),
        }
    }

    pub fn focused(&self) -> Control {
        Control::ALL[self.focus]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % Control::ALL.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + Control::ALL.len() - 1) % Control::ALL.len();
    }

    /// ←/→ on the focused control. Dates stay inside the supported month.
    pub fn adjust(&mut self, delta: i32) {
        let control = self.focused();
        let p = &mut self.params;
        match control {
            Control::Origin => p.origin = cycle(&Airport::ORIGINS, p.origin, delta),
            Control::Destination => p.destination = cycle(&Airport::DESTINATIONS, p.destination, delta),
            Control::StartDate => {
                p.start_date = self.coverage.clamp(p.start_date + Duration::days(delta as i64))
            }
            Control::EndDate => {
                p.end_date = self.coverage.clamp(p.end_date + Duration::days(delta as i64))
            }
            Control::IncludeSynthetic => p.include_synthetic = !p.include_synthetic,
            Control::MinLayover => {
                p.min_layover_minutes = step_int(
                    p.min_layover_minutes as i64,
                    delta,
                    LAYOVER_STEP,
                    0,
                    MAX_LAYOVER_MINUTES as i64,
                ) as u32
            }
            Control::Objective => {
                p.objective = match p.objective {
                    Objective::ValuePerMile => Objective::MinimumPrice,
                    Objective::MinimumPrice => Objective::ValuePerMile,
                }
            }
            Control::MinVpm => p.min_vpm_cents = step_float(p.min_vpm_cents, delta, VPM_STEP),
            Control::MaxPrice => p.max_price = step_float(p.max_price, delta, PRICE_STEP),
            Control::Airlines => {}
            Control::MilesBalance => {
                p.miles_balance =
                    step_int(p.miles_balance as i64, delta, MILES_STEP, 0, i64::MAX / 2) as u64
            }
            Control::MaxResults => {
                p.max_results = step_int(
                    p.max_results as i64,
                    delta,
                    RESULTS_STEP,
                    1,
                    MAX_RESULTS_LIMIT as i64,
                ) as u32
            }
        }
    }

    pub fn editing_text(&self) -> bool {
        self.focused() == Control::Airlines
    }

    pub fn type_char(&mut self, c: char) {
        self.airlines_text.push(c);
        self.params.airline_allowlist = parse_allowlist(&self.airlines_text);
    }

    pub fn backspace(&mut self) {
        self.airlines_text.pop();
        self.params.airline_allowlist = parse_allowlist(&self.airlines_text);
    }

    pub fn toggle_within(&mut self) {
        self.only_within = !self.only_within;
    }

    pub fn request(&self, action: Action) -> RenderRequest {
        RenderRequest {
            params: self.params.clone(),
            action,
            only_within_budget: self.only_within,
        }
    }

    pub fn view(&self) -> Option<&DashboardView> {
        match &self.page {
            Some(Page::Ready(view)) => Some(view),
            _ => None,
        }
    }

    /// Searching is allowed while the controls last validated without errors,
    /// whether or not the render that followed succeeded.
    pub fn search_enabled(&self) -> bool {
        self.validation.as_ref().is_some_and(Validation::search_enabled)
    }

    fn row_count(&self) -> usize {
        self.view()
            .and_then(|v| v.results())
            .map_or(0, |r| r.table.len())
    }

    pub fn set_page(&mut self, page: Page, validation: Validation) {
        self.page = Some(page);
        self.validation = Some(validation);
        let rows = self.row_count();
        match self.table_state.selected() {
            _ if rows == 0 => self.table_state.select(None),
            Some(i) if i >= rows => self.table_state.select(Some(rows - 1)),
            None => self.table_state.select(Some(0)),
            Some(_) => {}
        }
    }

    pub fn scroll(&mut self, down: bool) {
        let rows = self.row_count();
        if rows == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0);
        let next = if down {
            (current + PAGE_ROWS).min(rows - 1)
        } else {
            current.saturating_sub(PAGE_ROWS)
        };
        self.table_state.select(Some(next));
    }

    pub fn value_text(&self, control: Control) -> String {
        let p = &self.params;
        match control {
            Control::Origin => p.origin.to_string(),
            Control::Destination => p.destination.to_string(),
            Control::StartDate => p.start_date.to_string(),
            Control::EndDate => p.end_date.to_string(),
            Control::IncludeSynthetic => (if p.include_synthetic { "[x]" } else { "[ ]" }).to_string(),
            Control::MinLayover => p.min_layover_minutes.to_string(),
            Control::Objective => p.objective.to_string(),
            Control::MinVpm => format!("{:.1}", p.min_vpm_cents),
            Control::MaxPrice => format!("{:.0}", p.max_price),
            Control::Airlines if self.airlines_text.is_empty() => "(all)".to_string(),
            Control::Airlines => self.airlines_text.clone(),
            Control::MilesBalance => p.miles_balance.to_string(),
            Control::MaxResults => p.max_results.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

pub fn format_cents(v: Option<f64>) -> String {
    v.map_or("—".to_string(), |c| format!("{c:.2}¢"))
}

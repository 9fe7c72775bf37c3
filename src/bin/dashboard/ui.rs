use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Map, MapResolution},
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph,
        Row, Table, Wrap,
    },
    Frame,
};

use redemption_dashboard::airports::MapPanel;
use redemption_dashboard::config::{APP_TITLE, DATASET_TIPS, TAGLINE};
use redemption_dashboard::dashboard::{Page, ResultsView, ViewContent};
use redemption_dashboard::error::RenderFailure;
use redemption_dashboard::reshape::Column;
use redemption_dashboard::summary::Summary;
use redemption_dashboard::validation::{Message, Severity};
use redemption_dashboard::view::BudgetToggle;

use crate::app::{format_cents, truncate, App, Control};

fn panel(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

pub fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(0)])
        .split(chunks[1]);
    render_sidebar(f, app, body[0]);
    render_main(f, app, body[1]);

    render_footer(f, app, chunks[2]);
}

fn render_header(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(
            format!(" ✈ {APP_TITLE}  "),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(TAGLINE, Style::default().fg(Color::White)),
    ]);
    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Sidebar
// ---------------------------------------------------------------------------

fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focused();
    let mut lines: Vec<Line> = Vec::new();
    for control in Control::ALL {
        let is_focused = control == focused;
        let marker = if is_focused { "▶ " } else { "  " };
        let label_style = if is_focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(Color::Yellow)),
            Span::styled(control.label(), label_style),
        ]));
        let mut value = app.value_text(control);
        if is_focused && control == Control::Airlines {
            value.push('▏');
        }
        lines.push(Line::from(Span::styled(
            format!("    {}", truncate(&value, 34)),
            Style::default().fg(Color::White),
        )));
    }

    lines.push(Line::raw(""));
    let search_line = if app.search_enabled() {
        Span::styled(
            "  [Enter] 🔍 Search Routes",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("  Search disabled: fix errors", Style::default().fg(Color::DarkGray))
    };
    lines.push(Line::from(search_line));

    let paragraph = Paragraph::new(lines).block(panel("🎯 Search Parameters"));
    f.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Main area
// ---------------------------------------------------------------------------

fn severity_style(severity: Severity) -> (&'static str, Style) {
    match severity {
        Severity::Error => ("✗ ", Style::default().fg(Color::Red)),
        Severity::Warning => ("⚠ ", Style::default().fg(Color::Yellow)),
        Severity::Info => ("ℹ ", Style::default().fg(Color::Cyan)),
    }
}

fn message_lines(messages: &[Message]) -> Vec<Line<'_>> {
    messages
        .iter()
        .map(|m| {
            let (icon, style) = severity_style(m.severity);
            Line::from(vec![Span::styled(icon, style), Span::styled(m.text.as_str(), style)])
        })
        .collect()
}

fn render_main(f: &mut Frame, app: &mut App, area: Rect) {
    let Some(page) = app.page.clone() else {
        render_tips(f, area);
        return;
    };

    let view = match page {
        Page::Failed(failure) => {
            render_failure(f, &failure, area);
            return;
        }
        Page::Ready(view) => view,
    };

    let message_height = if view.messages.is_empty() {
        0
    } else {
        view.messages.len() as u16 + 2
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(message_height), Constraint::Min(0)])
        .split(area);

    if !view.messages.is_empty() {
        let paragraph = Paragraph::new(message_lines(&view.messages)).block(panel("Messages"));
        f.render_widget(paragraph, chunks[0]);
    }

    match &view.content {
        ViewContent::NoResults => render_tips(f, chunks[1]),
        ViewContent::Results(results) => render_results(f, app, results, chunks[1]),
    }
}

fn render_tips(f: &mut Frame, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            "No results yet. Adjust the parameters and press Enter to search.",
            Style::default().fg(Color::White),
        )),
        Line::raw(""),
    ];
    lines.extend(
        DATASET_TIPS
            .iter()
            .map(|tip| Line::from(Span::styled(format!("• {tip}"), Style::default().fg(Color::Gray)))),
    );
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(panel("📋 Dataset Tips"));
    f.render_widget(paragraph, area);
}

fn render_failure(f: &mut Frame, failure: &RenderFailure, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            failure.message.as_str(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
    ];
    lines.extend(
        failure
            .trace
            .iter()
            .map(|t| Line::from(Span::styled(t.as_str(), Style::default().fg(Color::DarkGray)))),
    );
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel("Render error"));
    f.render_widget(paragraph, area);
}

fn render_results(f: &mut Frame, app: &mut App, results: &ResultsView, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(14), // map | metrics + bars
            Constraint::Min(8),     // table
            Constraint::Length(12), // scatter
        ])
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[0]);
    render_map(f, &results.map, top[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(top[1]);
    render_metrics(f, app, results, right[0]);
    render_top_bars(f, &results.summary, right[1]);

    render_table(f, app, results, rows[1]);
    render_scatter(f, &results.summary, rows[2]);
}

fn render_map(f: &mut Frame, map: &MapPanel, area: Rect) {
    let (pins, midpoint, zoom) = match map {
        MapPanel::MissingLookup { caption } | MapPanel::NoMatches { caption } => {
            let paragraph = Paragraph::new(Span::styled(caption.as_str(), Style::default().fg(Color::DarkGray)))
                .wrap(Wrap { trim: true })
                .block(panel("🗺️ Map"));
            f.render_widget(paragraph, area);
            return;
        }
        MapPanel::Pins { pins, midpoint, zoom } => (pins, midpoint, *zoom),
    };

    // Zoom sets the minimum window; widen it until every pin fits.
    let mut half_lon = 360.0 / 2f64.powi(zoom as i32);
    for p in pins {
        half_lon = half_lon.max((p.lon - midpoint.longitude).abs() + 5.0);
    }
    let mut half_lat = half_lon / 2.0;
    for p in pins {
        half_lat = half_lat.max((p.lat - midpoint.latitude).abs() + 5.0);
    }
    let x_bounds = [
        (midpoint.longitude - half_lon).max(-180.0),
        (midpoint.longitude + half_lon).min(180.0),
    ];
    let y_bounds = [
        (midpoint.latitude - half_lat).max(-90.0),
        (midpoint.latitude + half_lat).min(90.0),
    ];

    let canvas = Canvas::default()
        .block(panel("🗺️ Map"))
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            ctx.draw(&Map {
                color: Color::DarkGray,
                resolution: MapResolution::High,
            });
            ctx.layer();
            for p in pins {
                ctx.print(
                    p.lon,
                    p.lat,
                    Span::styled(format!("● {}", p.iata), Style::default().fg(Color::Yellow)),
                );
            }
        });
    f.render_widget(canvas, area);
}

fn render_metrics(f: &mut Frame, app: &App, results: &ResultsView, area: Rect) {
    let summary = &results.summary;
    let mut lines = vec![Line::from(vec![
        Span::styled("Total routes: ", Style::default().fg(Color::Gray)),
        Span::styled(
            summary.total_routes.to_string(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   │   "),
        Span::styled("Best VPM: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format_cents(summary.best_value_per_mile),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   │   "),
        Span::styled(format!("Sorted by {}", results.objective), Style::default().fg(Color::Gray)),
    ])];

    match &results.budget {
        BudgetToggle::Hidden => {}
        BudgetToggle::Enabled { label, .. } => {
            let state = if app.only_within { "[x]" } else { "[ ]" };
            lines.push(Line::from(vec![
                Span::styled("[w] ", Style::default().fg(Color::Yellow)),
                Span::styled(format!("{state} {label}"), Style::default().fg(Color::White)),
            ]));
        }
        BudgetToggle::Disabled { caption } => {
            lines.push(Line::from(Span::styled(
                format!("[ ] {caption}"),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    let paragraph = Paragraph::new(lines).block(panel("📊 Summary"));
    f.render_widget(paragraph, area);
}

fn render_top_bars(f: &mut Frame, summary: &Summary, area: Rect) {
    let block = panel("🏆 Top 10 Routes by Value per Mile");
    if summary.top_by_value.is_empty() {
        f.render_widget(block, area);
        return;
    }

    let bars: Vec<Bar> = summary
        .top_by_value
        .iter()
        .map(|b| {
            Bar::default()
                .value((b.value_per_mile.max(0.0) * 100.0).round() as u64)
                .text_value(format!("{:.2}¢", b.value_per_mile))
                .label(Line::from(truncate(&b.label, 30)))
                .style(Style::default().fg(Color::Cyan))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .data(BarGroup::default().bars(&bars));
    f.render_widget(chart, area);
}

fn render_table(f: &mut Frame, app: &mut App, results: &ResultsView, area: Rect) {
    let table = &results.table;
    let columns = table.columns();

    let header_cells = columns
        .iter()
        .map(|c| Cell::from(c.label()).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = table
        .cells()
        .into_iter()
        .zip(&table.rows)
        .map(|(cells, row)| {
            let style = match row.within_budget {
                Some(false) => Style::default().fg(Color::DarkGray),
                _ => Style::default(),
            };
            Row::new(cells.into_iter().map(Cell::from)).style(style)
        })
        .collect();

    let widths: Vec<Constraint> = columns
        .iter()
        .map(|c| match c {
            Column::Airline | Column::Route => Constraint::Min(14),
            Column::Leg1Departs | Column::Leg1Arrives | Column::Leg2Departs | Column::Leg2Arrives => {
                Constraint::Length(16)
            }
            Column::Date => Constraint::Length(10),
            _ => Constraint::Length(c.label().chars().count().clamp(6, 12) as u16),
        })
        .collect();

    let title = format!("📋 Recommendations ({} rows)", table.len());
    let widget = Table::new(rows, widths)
        .header(header)
        .block(panel(&title))
        .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    f.render_stateful_widget(widget, area, &mut app.table_state);
}

fn render_scatter(f: &mut Frame, summary: &Summary, area: Rect) {
    let block = panel("💰 Price vs Miles");
    let Some(points) = &summary.price_vs_miles else {
        f.render_widget(block, area);
        return;
    };

    let data: Vec<(f64, f64)> = points.iter().map(|p| (p.miles, p.price)).collect();
    let max_miles = data.iter().map(|p| p.0).fold(0.0, f64::max).max(1.0) * 1.05;
    let max_price = data.iter().map(|p| p.1).fold(0.0, f64::max).max(1.0) * 1.05;

    let dataset = Dataset::default()
        .name("routes")
        .marker(Marker::Dot)
        .graph_type(GraphType::Scatter)
        .style(Style::default().fg(Color::Cyan))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .title("Miles")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, max_miles])
                .labels(vec!["0".to_string(), format!("{:.0}", max_miles / 2.0), format!("{max_miles:.0}")]),
        )
        .y_axis(
            Axis::default()
                .title("Price ($)")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, max_price])
                .labels(vec!["0".to_string(), format!("{:.0}", max_price / 2.0), format!("{max_price:.0}")]),
        );
    f.render_widget(chart, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" [q/Esc] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[↑↓] ", Style::default().fg(Color::Yellow)),
        Span::raw("field  "),
        Span::styled("[←→] ", Style::default().fg(Color::Yellow)),
        Span::raw("adjust  "),
        Span::styled("[Enter] ", Style::default().fg(Color::Yellow)),
        Span::raw("search  "),
        Span::styled("[w] ", Style::default().fg(Color::Yellow)),
        Span::raw("within miles  "),
        Span::styled("[e] ", Style::default().fg(Color::Yellow)),
        Span::raw("export CSV  "),
        Span::styled("[PgUp/PgDn] ", Style::default().fg(Color::Yellow)),
        Span::raw("scroll  "),
    ];
    if let Some(status) = &app.status {
        spans.push(Span::styled(status.as_str(), Style::default().fg(Color::DarkGray)));
    }
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}

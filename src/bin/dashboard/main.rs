mod app;
mod ui;

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use app::App;
use redemption_dashboard::config::Config;
use redemption_dashboard::dashboard::{Action, Dashboard, Page, ViewContent};
use redemption_dashboard::export::export_to_dir;
use redemption_dashboard::recommender::SqliteRecommender;
use redemption_dashboard::state::{MemorySession, SessionRegistry};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    // The alternate screen owns stdout, so logs go to a file.
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cfg.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();

    let dashboard = Dashboard::from_config(&cfg, Arc::new(SqliteRecommender::new()));
    let registry = SessionRegistry::new();
    let (session_id, session) = registry.start();
    info!(session = session_id, db = %cfg.db_path, "terminal dashboard started");

    let mut app = App::new(dashboard.coverage().clone());
    let page = dashboard.render_page(&app.request(Action::Idle), &*session).await;
    app.set_page(page, dashboard.validate(&app.params));

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &dashboard, &session, Path::new(&cfg.export_dir)).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    registry.end(session_id);
    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

enum Step {
    Quit,
    Render(Action),
    Export,
    Redraw,
}

fn handle_key(app: &mut App, key: KeyEvent) -> Step {
    match key.code {
        KeyCode::Esc => return Step::Quit,
        KeyCode::Up => app.focus_prev(),
        KeyCode::Down | KeyCode::Tab => app.focus_next(),
        KeyCode::Left => app.adjust(-1),
        KeyCode::Right => app.adjust(1),
        KeyCode::PageDown => {
            app.scroll(true);
            return Step::Redraw;
        }
        KeyCode::PageUp => {
            app.scroll(false);
            return Step::Redraw;
        }
        KeyCode::Enter if app.search_enabled() => return Step::Render(Action::Search),
        KeyCode::Enter => {
            app.status = Some("Search disabled until errors are fixed".to_string());
            return Step::Redraw;
        }
        KeyCode::Backspace if app.editing_text() => app.backspace(),
        KeyCode::Char(c) if app.editing_text() => app.type_char(c),
        KeyCode::Char('q') | KeyCode::Char('Q') => return Step::Quit,
        KeyCode::Char('w') | KeyCode::Char('W') => app.toggle_within(),
        KeyCode::Char('e') | KeyCode::Char('E') => return Step::Export,
        _ => return Step::Redraw,
    }
    Step::Render(Action::Idle)
}

fn export_view(app: &mut App, dir: &Path) {
    let results = match app.view().map(|v| &v.content) {
        Some(ViewContent::Results(results)) => results,
        _ => {
            app.status = Some("Nothing to export".to_string());
            return;
        }
    };
    let status = match export_to_dir(&results.table, &app.params, dir) {
        Ok(path) => format!("Exported {}", path.display()),
        Err(e) => {
            warn!("export failed: {e}");
            format!("Export failed: {e}")
        }
    };
    app.status = Some(status);
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    dashboard: &Dashboard,
    session: &MemorySession,
    export_dir: &Path,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui::render(f, app))?;

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match handle_key(app, key) {
            Step::Quit => return Ok(()),
            Step::Redraw => {}
            Step::Export => export_view(app, export_dir),
            Step::Render(action) => {
                if action == Action::Search {
                    app.status = Some("Searching…".to_string());
                    terminal.draw(|f| ui::render(f, app))?;
                }
                let page = dashboard.render_page(&app.request(action), session).await;
                if action == Action::Search {
                    app.status = match &page {
                        Page::Ready(view) => Some(format!(
                            "Search complete: {} routes",
                            view.results().map_or(0, |r| r.table.len())
                        )),
                        Page::Failed(_) => Some("Search failed".to_string()),
                    };
                }
                app.set_page(page, dashboard.validate(&app.params));
            }
        }
    }
}

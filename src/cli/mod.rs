//! TUI front-end entry (Ratatui + Crossterm)
//! - Verifies the identity token and opens the SQLite pool
//! - Sets up the terminal and restores it on exit, including on error

use std::io::Stdout;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::config::Config;
use crate::database::db::{connection, migrate};
use crate::identity::{self, IdentityVerifier};

pub mod api;
pub mod input;
pub mod state;
pub mod ui;
pub mod util;

type Term = Terminal<CrosstermBackend<Stdout>>;

pub async fn run(config: &Config) -> Result<()> {
    let mut app = init_app(config).await?;

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    tracing::info!(user = %app.api.owner().as_str(), "tui closed");
    result
}

async fn event_loop(terminal: &mut Term, app: &mut state::App) -> Result<()> {
    let tick_rate = Duration::from_millis(200);

    while !app.quit {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key).await?;
            }
        }
    }
    Ok(())
}

pub async fn init_app(config: &Config) -> Result<state::App> {
    let verifier = IdentityVerifier::new(config.jwt_secret()?.as_bytes());
    let owner = verifier
        .verify(config.token()?)
        .context("EXPENSE_TRACKER_TOKEN was rejected")?;

    let pool = connection::get_db_pool(&config.database_url)
        .await
        .with_context(|| format!("cannot open {}", config.database_url))?;
    migrate::run_migrations(&pool).await?;

    identity::sign_in(&pool, &owner).await?;
    tracing::info!(user = %owner.as_str(), "tui session started");

    let mut app = state::App::new(api::Client::new(pool, owner));
    app.refresh().await?;
    Ok(app)
}

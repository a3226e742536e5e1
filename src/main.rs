// main.rs

mod api;
mod app;
mod config;
mod error;
mod models;
mod parser;
mod realtime;
mod reconciler;
mod session;
mod ui;

use crate::api::Backend;
use crate::app::App;
use crate::ui::run_app;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load()?;
    let backend = Backend::new(&config.project_url, &config.api_key);

    // Restore the stored session, if any; an unreadable or absent session
    // just lands on the sign-in screen.
    let stored = session::load();
    let mut app = App::new(backend, config.image_bucket, stored);
    if app.is_authenticated() {
        app.refresh_tasks().await;
    }

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.hide_cursor()?;

    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

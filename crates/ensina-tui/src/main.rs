mod app;
mod handler;
mod logging;
mod tui;
mod ui;
mod view;

use std::sync::Arc;

use anyhow::Result;
use ensina_core::{reset_in_background, ChatClient, Config, SessionUpdates};

use crate::app::App;
use crate::tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    // Hold the guard so buffered log lines are flushed on exit
    let _log_guard = logging::init()?;

    let config = Config::load_or_init().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        Config::new()
    });

    let client = Arc::new(ChatClient::new(&config.base_url()));
    tracing::info!(base_url = %client.base_url(), locale = config.locale().as_tag(), "starting");

    // Fresh server-side session on every launch
    reset_in_background(client.clone());

    let (mut app, updates) = App::new(client, config.locale());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app, updates).await;

    tui::restore()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "exited with error");
    }
    result
}

async fn run(terminal: &mut Tui, app: &mut App, mut updates: SessionUpdates) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(app, event),
            Some(update) = updates.recv() => app.on_update(update),
            else => break,
        }
    }

    // Leaving mid-reply closes the request
    app.stop();
    Ok(())
}

//! Terminal dashboard.
//!
//! The dashboard controller from `ratwatch-core` runs in the background and
//! owns all state; this module only renders its snapshots and forwards the
//! test command. It handles:
//!
//! - Terminal setup and restoration
//! - The main loop with input handling and rendering
//! - Graceful shutdown of the controller

pub mod app;
pub mod input;
pub mod ui;

pub use app::App;

use std::io::{self, stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use time::OffsetDateTime;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{info, warn};

use ratwatch_core::firebase::RealtimeDatabase;
use ratwatch_core::{DashboardState, EventReceiver, RetryConfig, send_command};

use crate::backend::Backend;
use crate::config::Config;
use app::UiCommand;

/// Value written by the test command.
pub const TEST_COMMAND: &str = "test";

/// Set up the terminal for TUI rendering.
pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to its original state.
pub fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

/// Run the dashboard until the user quits.
///
/// The backend is connected before the terminal is touched, so
/// configuration errors print normally.
pub async fn run(config: Config) -> Result<()> {
    let backend = Backend::connect(&config)?;
    let handle = backend.start_dashboard(&config, true)?;
    info!("Dashboard started");

    let mut terminal = setup_terminal()?;

    let mut app = App::new(handle.state(), config.paths.command.clone());
    let (results_tx, results_rx) = mpsc::channel(4);
    let mut loop_ctx = LoopContext {
        states: handle.subscribe_state(),
        events: handle.events(),
        channel: backend.realtime.clone(),
        results_tx,
        results_rx,
    };

    // Run the app and ensure terminal is restored even on error
    let result = run_event_loop(&mut terminal, &mut app, &mut loop_ctx);

    restore_terminal()?;
    handle.shutdown().await;

    result
}

/// Channels the UI loop drains between frames.
struct LoopContext {
    states: watch::Receiver<DashboardState>,
    events: EventReceiver,
    channel: RealtimeDatabase,
    results_tx: mpsc::Sender<Result<(), String>>,
    results_rx: mpsc::Receiver<Result<(), String>>,
}

/// Main loop for the TUI.
fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    ctx: &mut LoopContext,
) -> Result<()> {
    while !app.should_quit() {
        app.clean_expired_messages();

        if ctx.states.has_changed().unwrap_or(false) {
            app.state = ctx.states.borrow_and_update().clone();
        }

        loop {
            match ctx.events.try_recv() {
                Ok(event) => app.handle_event(&event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(skipped = n, "Dashboard events lagged");
                }
                Err(_) => break,
            }
        }

        while let Ok(result) = ctx.results_rx.try_recv() {
            app.command_finished(result);
        }

        let now = OffsetDateTime::now_utc();
        terminal.draw(|f| ui::draw(f, app, now))?;

        // Poll for keyboard events with timeout
        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && let Some(UiCommand::SendTest) = app.handle_key(key.code)
        {
            spawn_send_test(ctx, &app.command_path);
        }
    }

    Ok(())
}

fn spawn_send_test(ctx: &LoopContext, path: &str) {
    let channel = ctx.channel.clone();
    let path = path.to_string();
    let tx = ctx.results_tx.clone();
    tokio::spawn(async move {
        let result = send_command(&channel, &path, TEST_COMMAND, &RetryConfig::for_write())
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(result).await;
    });
}

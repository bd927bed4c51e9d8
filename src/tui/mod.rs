//! Terminal UI for modelmate.

mod app;
mod ui;

use anyhow::Result;
use app::{App, KeyAction};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use modelmate::{MatchEvent, MatchSession, Side};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Runs the session under the terminal UI.
///
/// `human` carries the human's side and the channel the input line feeds,
/// present in training mode only.
pub async fn run(
    session: MatchSession,
    mut event_rx: mpsc::UnboundedReceiver<MatchEvent>,
    human: Option<(Side, mpsc::UnboundedSender<String>)>,
) -> Result<()> {
    // Log to file to avoid interfering with the TUI.
    let log_file = std::fs::File::create("modelmate_tui.log")?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .try_init();

    info!("Starting modelmate TUI");

    let abort = session.abort_handle();
    let mut session = session;
    let session_task = tokio::spawn(async move {
        let result = session.run().await;
        if let Err(e) = &result {
            error!(error = ?e, "Session ended with error");
        }
        result
    });

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_loop(&mut terminal, &mut event_rx, &abort, human).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!(error = ?err, "UI loop error");
        eprintln!("Error: {:?}", err);
    }

    // The abort flag is set by now if the user quit early; wait for the
    // session to wind down so the log is complete.
    let _ = session_task.await?;

    res
}

/// Draw/poll loop: drains session events, renders, and routes key presses.
async fn run_loop<B: ratatui::backend::Backend<Error: Send + Sync + 'static>>(
    terminal: &mut Terminal<B>,
    event_rx: &mut mpsc::UnboundedReceiver<MatchEvent>,
    abort: &Arc<AtomicBool>,
    human: Option<(Side, mpsc::UnboundedSender<String>)>,
) -> Result<()> {
    let mut app = App::new(human.as_ref().map(|(side, _)| *side));
    let mut input_tx = human.map(|(_, tx)| tx);

    loop {
        loop {
            match event_rx.try_recv() {
                Ok(event) => app.handle_event(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    app.set_session_closed();
                    break;
                }
            }
        }

        terminal.draw(|frame| ui::draw(frame, &app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                match app.on_key(key.code) {
                    KeyAction::Quit => {
                        info!("User quit");
                        abort.store(true, Ordering::Relaxed);
                        // Dropping the sender unblocks a waiting human turn.
                        drop(input_tx.take());
                        return Ok(());
                    }
                    KeyAction::Submit(line) => {
                        if let Some(tx) = &input_tx {
                            let _ = tx.send(line);
                        }
                    }
                    KeyAction::None => {}
                }
            }
        }
    }
}

//! Modelmate - Unified CLI
//!
//! Chess matches between locally-hosted language models, with a terminal
//! board view or a headless outcome stream.

#![warn(missing_docs)]

mod cli;
mod tui;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use modelmate::{
    HumanPlayer, MatchConfig, MatchEvent, MatchSession, ModelClient, ModelPlayer, MoveProvider,
    SessionLog, SessionMode, SessionOptions, Side, TurnResolution,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Match {
            white,
            black,
            max_attempts,
            games,
            log,
            headless,
        } => {
            if let Some(white) = white {
                config.set_white_model(white);
            }
            if let Some(black) = black {
                config.set_black_model(black);
            }
            if let Some(max_attempts) = max_attempts {
                config.set_max_attempts(max_attempts);
            }
            if let Some(games) = games {
                config.set_games(games);
            }
            if let Some(log) = log {
                config.set_log_path(log);
            }
            config.validate()?;
            run_match(config, headless).await
        }
        Command::Train {
            white,
            black,
            play_white,
            log,
        } => {
            if let Some(white) = white {
                config.set_white_model(white);
            }
            if let Some(black) = black {
                config.set_black_model(black);
            }
            if play_white {
                config.set_human_side(Side::White);
            }
            if let Some(log) = log {
                config.set_log_path(log);
            }
            config.validate()?;
            run_train(config).await
        }
    }
}

/// Loads configuration from the given path, `modelmate.toml` if present,
/// or defaults.
fn load_config(path: Option<&Path>) -> Result<MatchConfig> {
    if let Some(path) = path {
        return Ok(MatchConfig::from_file(path)?);
    }
    let default_path = PathBuf::from("modelmate.toml");
    if default_path.exists() {
        Ok(MatchConfig::from_file(&default_path)?)
    } else {
        Ok(MatchConfig::default())
    }
}

/// Runs a competitive model-vs-model series.
async fn run_match(config: MatchConfig, headless: bool) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let white: Vec<Box<dyn MoveProvider>> =
        vec![Box::new(model_player(&config, config.white_model()))];
    let black: Vec<Box<dyn MoveProvider>> =
        vec![Box::new(model_player(&config, config.black_model()))];

    let log = SessionLog::open(config.log_path())?;
    let session = MatchSession::new(
        white,
        black,
        log,
        event_tx,
        session_options(&config, SessionMode::Competitive),
    );

    if headless {
        run_headless(session, event_rx).await
    } else {
        tui::run(session, event_rx, None).await
    }
}

/// Runs an interactive training game: the human against both configured
/// models cooperating on the other side.
async fn run_train(config: MatchConfig) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (input_tx, input_rx) = mpsc::unbounded_channel();

    let human: Box<dyn MoveProvider> = Box::new(HumanPlayer::new("you", input_rx));
    let models: Vec<Box<dyn MoveProvider>> = vec![
        Box::new(model_player(&config, config.white_model())),
        Box::new(model_player(&config, config.black_model())),
    ];

    let human_side = *config.human_side();
    let (white, black) = match human_side {
        Side::White => (vec![human], models),
        Side::Black => (models, vec![human]),
    };

    let log = SessionLog::open(config.log_path())?;
    let session = MatchSession::new(
        white,
        black,
        log,
        event_tx,
        session_options(&config, SessionMode::Training),
    );

    tui::run(session, event_rx, Some((human_side, input_tx))).await
}

fn model_player(config: &MatchConfig, model: &str) -> ModelPlayer {
    ModelPlayer::new(ModelClient::new(
        config.invoke_with().clone(),
        model,
        Duration::from_secs(*config.move_timeout_secs()),
    ))
}

fn session_options(config: &MatchConfig, mode: SessionMode) -> SessionOptions {
    SessionOptions {
        mode,
        max_attempts: *config.max_attempts(),
        retry_delay_ms: *config.retry_delay_ms(),
        move_delay_ms: *config.move_delay_ms(),
        games: match mode {
            SessionMode::Competitive => *config.games(),
            SessionMode::Training => 1,
        },
    }
}

/// Runs the session without a terminal UI, printing outcomes to stdout.
async fn run_headless(
    mut session: MatchSession,
    mut event_rx: mpsc::UnboundedReceiver<MatchEvent>,
) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting headless match");

    // Cooperative abort on Ctrl+C, checked between turns.
    let abort = session.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.store(true, std::sync::atomic::Ordering::Relaxed);
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                MatchEvent::GameStarted { game, .. } => {
                    println!("=== Game {} ===", game);
                }
                MatchEvent::Thinking { side, player } => {
                    println!("{} ({}) is thinking...", player, side);
                }
                MatchEvent::TurnCompleted { outcome, .. } => match outcome.resolution {
                    TurnResolution::MoveApplied(uci) => {
                        println!("{} plays {}", outcome.side, uci);
                    }
                    TurnResolution::Skipped => {
                        println!(
                            "{} exhausted {} attempts, turn skipped",
                            outcome.side, outcome.attempts
                        );
                    }
                    TurnResolution::GameEnded => {}
                },
                MatchEvent::GameOver { game, reason, tally } => {
                    println!("Game {} over: {:?}", game, reason);
                    println!(
                        "Tally: white {} / black {} / drawn {}",
                        tally.white_wins, tally.black_wins, tally.draws
                    );
                }
            }
        }
    });

    let tally = session.run().await?;
    drop(session);
    let _ = printer.await;

    println!(
        "Series complete: white {} / black {} / drawn {}",
        tally.white_wins, tally.black_wins, tally.draws
    );
    Ok(())
}

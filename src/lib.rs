//! Modelmate library - chess matches between local language models
//!
//! Wires externally-invoked model processes (or a human) into a
//! legality-enforced chess game with a full interaction log.
//!
//! # Architecture
//!
//! - **Board**: wraps the `shakmaty` rules engine; legality and terminal
//!   status live there, not here
//! - **Notation**: extracts a coordinate-move token from free-form text
//! - **Players**: `MoveProvider` implementations (subprocess model, human
//!   input line, scripted stub)
//! - **Controller**: the turn/retry/skip state machine that owns a session
//! - **Session log**: append-only JSON-lines trail of every exchange
//!
//! # Example
//!
//! ```no_run
//! use modelmate::{MatchSession, ModelClient, ModelPlayer, SessionLog, SessionOptions};
//! use std::time::Duration;
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let invoke = vec!["ollama".to_string(), "run".to_string()];
//! let white = ModelPlayer::new(ModelClient::new(invoke.clone(), "deepseek-r1:1.5b", Duration::from_secs(30)));
//! let black = ModelPlayer::new(ModelClient::new(invoke, "deepseek-r1:1.5b", Duration::from_secs(30)));
//! let log = SessionLog::open("modelmate.log")?;
//! let (event_tx, _event_rx) = mpsc::unbounded_channel();
//! let mut session = MatchSession::new(
//!     vec![Box::new(white)],
//!     vec![Box::new(black)],
//!     log,
//!     event_tx,
//!     SessionOptions::default(),
//! );
//! let _tally = session.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod board;
mod config;
mod controller;
mod model_client;
mod notation;
mod players;
mod prompt;
mod session_log;

// Crate-level exports - Board state
pub use board::{
    BoardState, GameStatus, IllegalMoveError, InvalidPositionError, Side, SkipTurnError,
};

// Crate-level exports - Move parsing
pub use notation::{MoveCandidate, extract_move};

// Crate-level exports - Prompt construction
pub use prompt::build_prompt;

// Crate-level exports - Model invocation
pub use model_client::{ModelClient, ModelOutput, TransportError};

// Crate-level exports - Providers
pub use players::{HumanPlayer, ModelPlayer, MoveProvider, ProviderReply, ScriptedPlayer, ScriptedReply};

// Crate-level exports - Turn controller
pub use controller::{
    AttemptOutcome, EndReason, MatchEvent, MatchSession, SessionMode, SessionOptions, Tally,
    TurnOutcome, TurnResolution,
};

// Crate-level exports - Session log
pub use session_log::{LogError, LogEvent, SessionLog};

// Crate-level exports - Configuration
pub use config::{ConfigError, MatchConfig};

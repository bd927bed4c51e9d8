//! Append-only session log.
//!
//! One JSON object per line, flushed after every write so nothing is lost
//! on abrupt termination. The core never reads it back; it exists so a full
//! interaction trail (every prompt, every raw response, every resolution)
//! survives the game.

use crate::board::{GameStatus, Side};
use crate::controller::{AttemptOutcome, EndReason, SessionMode, Tally, TurnResolution};
use chrono::Utc;
use derive_more::{Display, Error};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, instrument};

/// One logged event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    /// A session began; written once, before the first game of the series.
    Start {
        /// Competitive or training.
        mode: SessionMode,
        /// White's actor name.
        white: String,
        /// Black's actor name.
        black: String,
        /// Per-provider attempt budget.
        max_attempts: u32,
        /// Number of games in the series.
        games: u32,
    },
    /// One model invocation: the full prompt and the raw output.
    Exchange {
        /// The model identifier.
        model: String,
        /// The full prompt text sent over stdin.
        prompt: String,
        /// Raw stdout, possibly empty.
        stdout: String,
        /// Raw stderr, when the runtime produced any.
        #[serde(skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
        /// How the attempt resolved.
        outcome: AttemptOutcome,
        /// Transport failure detail, when there was one.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// One attempt by either actor.
    Attempt {
        /// Model identifier or the human player's name.
        actor: String,
        /// The side attempting to move.
        side: Side,
        /// 1-based attempt number within the turn.
        attempt: u32,
        /// The raw text the attempt was parsed from.
        raw: String,
        /// The parsed candidate, when one was found.
        #[serde(skip_serializing_if = "Option::is_none")]
        candidate: Option<String>,
        /// How the attempt resolved.
        outcome: AttemptOutcome,
    },
    /// One completed turn.
    Turn {
        /// The side whose turn it was.
        side: Side,
        /// Attempts consumed before resolution.
        attempts: u32,
        /// How the turn resolved.
        resolution: TurnResolution,
    },
    /// A game finished.
    End {
        /// 1-based game number within the series.
        game: u32,
        /// Why the game ended.
        reason: EndReason,
        /// Board status at the end.
        status: GameStatus,
        /// Running series tally.
        tally: Tally,
    },
}

#[derive(Debug, Serialize)]
struct Entry<'a> {
    ts: String,
    #[serde(flatten)]
    event: &'a LogEvent,
}

/// Session log error.
#[derive(Debug, Display, Error)]
#[display("Session log error: {} at {}:{}", message, file, line)]
pub struct LogError {
    /// Error message.
    pub message: String,
    /// Line number where the error occurred.
    pub line: u32,
    /// Source file where the error occurred.
    pub file: &'static str,
}

impl LogError {
    /// Creates a new session log error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Append-only, flush-on-write JSON-lines sink.
#[derive(Debug)]
pub struct SessionLog {
    out: File,
}

impl SessionLog {
    /// Opens (or creates) the log file in append mode.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|e| LogError::new(format!("Failed to open log file: {}", e)))?;
        info!("Session log opened");
        Ok(Self { out })
    }

    /// Appends one event as a single JSON line and flushes.
    pub fn append(&mut self, event: &LogEvent) -> Result<(), LogError> {
        let entry = Entry {
            ts: Utc::now().to_rfc3339(),
            event,
        };
        let mut line = serde_json::to_string(&entry)
            .map_err(|e| LogError::new(format!("Failed to serialize log event: {}", e)))?;
        line.push('\n');
        self.out
            .write_all(line.as_bytes())
            .map_err(|e| LogError::new(format!("Failed to write log event: {}", e)))?;
        self.out
            .flush()
            .map_err(|e| LogError::new(format!("Failed to flush log: {}", e)))?;
        debug!(len = line.len(), "Log event appended");
        Ok(())
    }
}

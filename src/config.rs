//! Match configuration.

use crate::board::Side;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Configuration for a match, loaded from TOML with per-field defaults.
///
/// Command-line flags override individual fields after loading.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Model identifier for the White side.
    #[serde(default = "default_model")]
    white_model: String,

    /// Model identifier for the Black side.
    #[serde(default = "default_model")]
    black_model: String,

    /// Invalid attempts allowed per provider before the turn is skipped.
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,

    /// Command prefix the model identifier is appended to.
    #[serde(default = "default_invoke_with")]
    invoke_with: Vec<String>,

    /// Seconds to wait for a single model invocation.
    #[serde(default = "default_move_timeout_secs")]
    move_timeout_secs: u64,

    /// Pause between failed attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    retry_delay_ms: u64,

    /// Pacing pause after an applied move, in milliseconds.
    #[serde(default = "default_move_delay_ms")]
    move_delay_ms: u64,

    /// Which side the human plays in training mode.
    #[serde(default = "default_human_side")]
    human_side: Side,

    /// Number of games in a competitive series.
    #[serde(default = "default_games")]
    games: u32,

    /// Where the session log is written.
    #[serde(default = "default_log_path")]
    log_path: PathBuf,
}

fn default_model() -> String {
    "deepseek-r1:1.5b".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_invoke_with() -> Vec<String> {
    vec!["ollama".to_string(), "run".to_string()]
}

fn default_move_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_move_delay_ms() -> u64 {
    1000
}

fn default_human_side() -> Side {
    // The human takes the second-moving side.
    Side::Black
}

fn default_games() -> u32 {
    1
}

fn default_log_path() -> PathBuf {
    PathBuf::from("modelmate.log")
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            white_model: default_model(),
            black_model: default_model(),
            max_attempts: default_max_attempts(),
            invoke_with: default_invoke_with(),
            move_timeout_secs: default_move_timeout_secs(),
            retry_delay_ms: default_retry_delay_ms(),
            move_delay_ms: default_move_delay_ms(),
            human_side: default_human_side(),
            games: default_games(),
            log_path: default_log_path(),
        }
    }
}

impl MatchConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        info!(
            white = %config.white_model,
            black = %config.black_model,
            "Config loaded successfully"
        );
        Ok(config)
    }

    /// Checks invariants the rest of the system relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::new("max_attempts must be at least 1".to_string()));
        }
        if self.invoke_with.is_empty() {
            return Err(ConfigError::new("invoke_with must name a command".to_string()));
        }
        if self.games == 0 {
            return Err(ConfigError::new("games must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Overrides the White model identifier.
    pub fn set_white_model(&mut self, model: String) {
        self.white_model = model;
    }

    /// Overrides the Black model identifier.
    pub fn set_black_model(&mut self, model: String) {
        self.black_model = model;
    }

    /// Overrides the per-provider attempt budget.
    pub fn set_max_attempts(&mut self, max_attempts: u32) {
        self.max_attempts = max_attempts;
    }

    /// Overrides the series length.
    pub fn set_games(&mut self, games: u32) {
        self.games = games;
    }

    /// Overrides the session log path.
    pub fn set_log_path(&mut self, path: PathBuf) {
        self.log_path = path;
    }

    /// Overrides the human's side for training mode.
    pub fn set_human_side(&mut self, side: Side) {
        self.human_side = side;
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
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

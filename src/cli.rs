//! Command-line interface for modelmate.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Modelmate - chess matches between local language models
#[derive(Parser, Debug)]
#[command(name = "modelmate")]
#[command(about = "Watch local language models play legality-enforced chess", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Competitive mode: model vs model with retry-then-skip turns
    Match {
        /// Model identifier for White
        #[arg(long)]
        white: Option<String>,

        /// Model identifier for Black
        #[arg(long)]
        black: Option<String>,

        /// Invalid attempts allowed per model before the turn is skipped
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Number of games in the series
        #[arg(long)]
        games: Option<u32>,

        /// Session log path
        #[arg(long)]
        log: Option<PathBuf>,

        /// Print outcomes to stdout instead of drawing the board
        #[arg(long)]
        headless: bool,
    },

    /// Training mode: you vs two cooperating models; one bad input ends the game
    Train {
        /// Model identifier for the first cooperating model
        #[arg(long)]
        white: Option<String>,

        /// Model identifier for the second cooperating model
        #[arg(long)]
        black: Option<String>,

        /// Play White instead of the default Black
        #[arg(long)]
        play_white: bool,

        /// Session log path
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

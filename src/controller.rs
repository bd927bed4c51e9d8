//! Turn orchestration: the retry/skip state machine.
//!
//! The controller owns the board and drives one turn at a time: obtain raw
//! text from the active provider, parse it, validate it against the legal
//! move set, and either apply the move or burn an attempt. Model-controlled
//! sides retry up to their budget and then forfeit the turn; a human side
//! ends the game on its first bad input. Per-attempt failures never escape
//! this module; the presentation layer sees turn outcomes and the terminal
//! state only, while the session log records everything.

use crate::board::{BoardState, GameStatus, Side};
use crate::model_client::TransportError;
use crate::notation;
use crate::players::{MoveProvider, ProviderReply};
use crate::session_log::{LogEvent, SessionLog};
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Who controls the sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Both sides are model-controlled.
    Competitive,
    /// One side is the person at the keyboard.
    Training,
}

/// How a single attempt resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// A legal move was extracted and validated.
    Legal,
    /// The raw text was blank.
    Empty,
    /// The raw text contained no move token.
    IllegalFormat,
    /// A token was found but is not in the legal-move set.
    IllegalRule,
    /// The invocation failed before producing usable text.
    Transport,
}

/// How a turn resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnResolution {
    /// A move was validated and applied; carries its coordinate notation.
    MoveApplied(String),
    /// The side exhausted its attempt budget and forfeited the turn.
    Skipped,
    /// The game ended during this turn.
    GameEnded,
}

/// The product of one turn, consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The side whose turn it was.
    pub side: Side,
    /// How the turn resolved.
    pub resolution: TurnResolution,
    /// Attempts consumed before resolution.
    pub attempts: u32,
}

/// Why a game finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EndReason {
    /// A side delivered mate.
    Checkmate {
        /// The mating side.
        winner: Side,
    },
    /// The side to move had no legal reply and was not in check.
    Stalemate,
    /// Drawn under the rules engine's draw conditions.
    Draw,
    /// A side resigned, aborted, or (human) failed its single attempt.
    Resigned {
        /// The side that gave up.
        loser: Side,
    },
    /// Both sides stalled out, or a skip produced no playable position.
    Aborted,
}

/// Win/draw tally across a competitive series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// Games won by White.
    pub white_wins: u32,
    /// Games won by Black.
    pub black_wins: u32,
    /// Drawn or aborted games.
    pub draws: u32,
}

impl Tally {
    /// Folds one game result into the tally.
    pub fn record(&mut self, reason: EndReason) {
        match reason {
            EndReason::Checkmate { winner: Side::White }
            | EndReason::Resigned { loser: Side::Black } => self.white_wins += 1,
            EndReason::Checkmate { winner: Side::Black }
            | EndReason::Resigned { loser: Side::White } => self.black_wins += 1,
            EndReason::Stalemate | EndReason::Draw | EndReason::Aborted => self.draws += 1,
        }
    }
}

/// Messages sent from the session to the presentation layer.
///
/// Parse and transport failures stay out of this channel; they are visible
/// only in the session log.
#[derive(Debug, Clone)]
pub enum MatchEvent {
    /// A game in the series began.
    GameStarted {
        /// 1-based game number.
        game: u32,
        /// Starting position.
        fen: String,
    },
    /// A provider is working on its move.
    Thinking {
        /// The side to move.
        side: Side,
        /// The active provider's name.
        player: String,
    },
    /// A turn resolved.
    TurnCompleted {
        /// The turn outcome.
        outcome: TurnOutcome,
        /// Position after the turn.
        fen: String,
        /// Full move history after the turn.
        history: Vec<String>,
    },
    /// A game finished.
    GameOver {
        /// 1-based game number.
        game: u32,
        /// Why it ended.
        reason: EndReason,
        /// Running series tally.
        tally: Tally,
    },
}

/// Tunable knobs for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Competitive or training.
    pub mode: SessionMode,
    /// Invalid attempts allowed per provider before the turn is skipped.
    pub max_attempts: u32,
    /// Pause between failed attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Pacing pause after an applied move, in milliseconds.
    pub move_delay_ms: u64,
    /// Number of games to play.
    pub games: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            mode: SessionMode::Competitive,
            max_attempts: 5,
            retry_delay_ms: 1000,
            move_delay_ms: 1000,
            games: 1,
        }
    }
}

enum Attempted {
    Applied(String),
    Failed(AttemptOutcome),
    Disconnected,
}

/// An explicit game session: board, providers, log, and policy.
///
/// Strictly sequential: exactly one provider call is outstanding at any
/// time, and nothing else mutates the board.
pub struct MatchSession {
    board: BoardState,
    white: Vec<Box<dyn MoveProvider>>,
    black: Vec<Box<dyn MoveProvider>>,
    options: SessionOptions,
    log: SessionLog,
    events: mpsc::UnboundedSender<MatchEvent>,
    abort: Arc<AtomicBool>,
    tally: Tally,
}

impl MatchSession {
    /// Creates a session over provider rosters for each side.
    ///
    /// A roster usually holds one provider; training mode gives the model
    /// side both configured models, doubling its attempt budget.
    pub fn new(
        white: Vec<Box<dyn MoveProvider>>,
        black: Vec<Box<dyn MoveProvider>>,
        log: SessionLog,
        events: mpsc::UnboundedSender<MatchEvent>,
        options: SessionOptions,
    ) -> Self {
        Self {
            board: BoardState::new(),
            white,
            black,
            options,
            log,
            events,
            abort: Arc::new(AtomicBool::new(false)),
            tally: Tally::default(),
        }
    }

    /// A flag the presentation layer sets to request a cooperative abort.
    ///
    /// Checked between turns, never mid-invocation.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// The board owned by this session.
    pub fn board(&self) -> &BoardState {
        &self.board
    }

    /// The running series tally.
    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    /// Plays the whole configured series, returning the final tally.
    #[instrument(skip(self), fields(games = self.options.games))]
    pub async fn run(&mut self) -> Result<Tally> {
        let white = roster_names(&self.white);
        let black = roster_names(&self.black);
        info!(%white, %black, "Starting session");
        self.log.append(&LogEvent::Start {
            mode: self.options.mode,
            white,
            black,
            max_attempts: self.options.max_attempts,
            games: self.options.games,
        })?;

        for game in 1..=self.options.games {
            self.run_game(game).await?;
            if self.abort.load(Ordering::Relaxed) {
                info!("Abort requested, ending series");
                break;
            }
        }
        Ok(self.tally.clone())
    }

    /// Plays one game to its terminal state.
    #[instrument(skip(self))]
    pub async fn run_game(&mut self, game: u32) -> Result<EndReason> {
        self.board = BoardState::new();
        self.events.send(MatchEvent::GameStarted {
            game,
            fen: self.board.fen(),
        })?;

        let mut consecutive_skips = 0u32;
        let reason = loop {
            // A finished game reports its true reason even when an abort
            // arrives in the same window.
            let status = self.board.status();
            if status.is_terminal() {
                break end_reason(status);
            }

            if self.abort.load(Ordering::Relaxed) {
                info!("Abort requested, resigning for side to move");
                let side = self.board.side_to_move();
                self.board.resign(side);
                break end_reason(self.board.status());
            }

            let outcome = self.play_turn().await?;
            match outcome.resolution {
                TurnResolution::MoveApplied(_) => {
                    consecutive_skips = 0;
                    if self.options.move_delay_ms > 0 {
                        sleep(Duration::from_millis(self.options.move_delay_ms)).await;
                    }
                }
                TurnResolution::Skipped => {
                    consecutive_skips += 1;
                    if consecutive_skips >= 2 {
                        info!("Both sides stalled out, aborting game");
                        break EndReason::Aborted;
                    }
                }
                TurnResolution::GameEnded => {
                    let status = self.board.status();
                    break if status.is_terminal() {
                        end_reason(status)
                    } else {
                        EndReason::Aborted
                    };
                }
            }
        };

        if self.options.mode == SessionMode::Competitive {
            self.tally.record(reason);
        }
        info!(?reason, "Game over");
        self.log.append(&LogEvent::End {
            game,
            reason,
            status: self.board.status(),
            tally: self.tally.clone(),
        })?;
        self.events.send(MatchEvent::GameOver {
            game,
            reason,
            tally: self.tally.clone(),
        })?;
        Ok(reason)
    }

    /// Runs one side's turn through the retry/skip policy.
    ///
    /// Starts at `AwaitingInput(side, 0)` and loops until a move is applied,
    /// the turn is skipped, or the game ends.
    #[instrument(skip(self))]
    pub async fn play_turn(&mut self) -> Result<TurnOutcome> {
        let side = self.board.side_to_move();
        let roster_len = match side {
            Side::White => self.white.len(),
            Side::Black => self.black.len(),
        } as u32;
        if roster_len == 0 {
            warn!(%side, "No provider for side, ending game");
            self.board.resign(side);
            return self.finish_turn(side, TurnResolution::GameEnded, 0);
        }
        let budget = self.options.max_attempts * roster_len;

        let mut attempt = 0u32;
        loop {
            // AwaitingInput(side, attempt): the active provider rotates
            // through the roster as budgets are consumed.
            let idx = (attempt / self.options.max_attempts) as usize;
            let (name, human) = {
                let provider = match side {
                    Side::White => &self.white[idx],
                    Side::Black => &self.black[idx],
                };
                (provider.name().to_string(), provider.is_human())
            };

            debug!(%side, attempt, player = %name, "Awaiting input");
            self.events.send(MatchEvent::Thinking {
                side,
                player: name.clone(),
            })?;

            let reply = match side {
                Side::White => self.white[idx].provide(&self.board).await,
                Side::Black => self.black[idx].provide(&self.board).await,
            };
            let number = attempt + 1;

            match self.classify(side, &name, number, reply)? {
                Attempted::Applied(uci) => {
                    return self.finish_turn(side, TurnResolution::MoveApplied(uci), number);
                }
                Attempted::Disconnected => {
                    self.board.resign(side);
                    return self.finish_turn(side, TurnResolution::GameEnded, number);
                }
                Attempted::Failed(outcome) => {
                    debug!(%side, attempt = number, ?outcome, "Attempt failed");
                    if human {
                        // Training policy: one strike and the game is over.
                        self.board.resign(side);
                        return self.finish_turn(side, TurnResolution::GameEnded, number);
                    }
                    attempt = number;
                    if attempt >= budget {
                        info!(%side, budget, "Attempt budget exhausted, skipping turn");
                        return match self.board.skip_turn() {
                            Ok(()) => self.finish_turn(side, TurnResolution::Skipped, attempt),
                            Err(e) => {
                                // The stalled side is in check; there is no
                                // playable position to hand over.
                                warn!(%side, error = %e, "Skip impossible, aborting game");
                                self.finish_turn(side, TurnResolution::GameEnded, attempt)
                            }
                        };
                    }
                    if self.options.retry_delay_ms > 0 {
                        sleep(Duration::from_millis(self.options.retry_delay_ms)).await;
                    }
                }
            }
        }
    }

    /// Logs, parses, and validates a single reply.
    fn classify(
        &mut self,
        side: Side,
        name: &str,
        number: u32,
        reply: ProviderReply,
    ) -> Result<Attempted> {
        match reply {
            ProviderReply::Disconnected => {
                warn!(%side, player = %name, "Provider disconnected");
                Ok(Attempted::Disconnected)
            }
            ProviderReply::Transport { prompt, error } => {
                let (stdout, stderr) = match &error {
                    TransportError::Exit { stdout, stderr, .. } => (
                        stdout.clone(),
                        (!stderr.is_empty()).then(|| stderr.clone()),
                    ),
                    _ => (String::new(), None),
                };
                if let Some(prompt) = prompt {
                    self.log.append(&LogEvent::Exchange {
                        model: name.to_string(),
                        prompt,
                        stdout,
                        stderr,
                        outcome: AttemptOutcome::Transport,
                        error: Some(error.to_string()),
                    })?;
                }
                self.log.append(&LogEvent::Attempt {
                    actor: name.to_string(),
                    side,
                    attempt: number,
                    raw: String::new(),
                    candidate: None,
                    outcome: AttemptOutcome::Transport,
                })?;
                Ok(Attempted::Failed(AttemptOutcome::Transport))
            }
            ProviderReply::Text {
                prompt,
                raw,
                stderr,
            } => {
                let candidate = notation::extract_move(&raw);
                let (outcome, resolved) = match &candidate {
                    None => {
                        let outcome = if raw.trim().is_empty() {
                            AttemptOutcome::Empty
                        } else {
                            AttemptOutcome::IllegalFormat
                        };
                        (outcome, None)
                    }
                    Some(candidate) => match self.board.resolve(candidate) {
                        Ok(m) => (AttemptOutcome::Legal, Some(m)),
                        Err(e) => {
                            debug!(%side, error = %e, "Candidate rejected by rules engine");
                            (AttemptOutcome::IllegalRule, None)
                        }
                    },
                };
                if let Some(prompt) = prompt {
                    self.log.append(&LogEvent::Exchange {
                        model: name.to_string(),
                        prompt,
                        stdout: raw.clone(),
                        stderr,
                        outcome,
                        error: None,
                    })?;
                }
                self.log.append(&LogEvent::Attempt {
                    actor: name.to_string(),
                    side,
                    attempt: number,
                    raw,
                    candidate: candidate.map(|c| c.uci()),
                    outcome,
                })?;
                match resolved {
                    Some(m) => {
                        let uci = self.board.apply(m)?;
                        info!(%side, %uci, "Move applied");
                        Ok(Attempted::Applied(uci))
                    }
                    None => Ok(Attempted::Failed(outcome)),
                }
            }
        }
    }

    /// Records the turn in the log and notifies the presentation layer.
    fn finish_turn(
        &mut self,
        side: Side,
        resolution: TurnResolution,
        attempts: u32,
    ) -> Result<TurnOutcome> {
        let outcome = TurnOutcome {
            side,
            resolution: resolution.clone(),
            attempts,
        };
        self.log.append(&LogEvent::Turn {
            side,
            attempts,
            resolution,
        })?;
        self.events.send(MatchEvent::TurnCompleted {
            outcome: outcome.clone(),
            fen: self.board.fen(),
            history: self.board.history().to_vec(),
        })?;
        Ok(outcome)
    }
}

fn roster_names(roster: &[Box<dyn MoveProvider>]) -> String {
    roster
        .iter()
        .map(|p| p.name().to_string())
        .collect::<Vec<_>>()
        .join("+")
}

fn end_reason(status: GameStatus) -> EndReason {
    match status {
        GameStatus::Checkmate { winner } => EndReason::Checkmate { winner },
        GameStatus::Stalemate => EndReason::Stalemate,
        GameStatus::Draw => EndReason::Draw,
        GameStatus::Resigned { loser } => EndReason::Resigned { loser },
        // Callers only translate terminal statuses.
        GameStatus::Ongoing => EndReason::Aborted,
    }
}

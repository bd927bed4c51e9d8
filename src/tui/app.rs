//! Application state for the terminal UI.

use crossterm::event::KeyCode;
use modelmate::{BoardState, EndReason, MatchEvent, Side, Tally, TurnResolution};
use tracing::debug;

/// What a key press asks the UI loop to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Nothing actionable.
    None,
    /// Abort the session and leave.
    Quit,
    /// Submit the typed input line as the human's move.
    Submit(String),
}

/// Mirror of the session state, updated from [`MatchEvent`]s.
pub struct App {
    board: BoardState,
    status_message: String,
    history: Vec<String>,
    tally: Tally,
    input: String,
    human_side: Option<Side>,
    finished: bool,
    session_closed: bool,
}

impl App {
    /// Creates the application state. `human_side` is set in training mode.
    pub fn new(human_side: Option<Side>) -> Self {
        Self {
            board: BoardState::new(),
            status_message: "Waiting for game to start...".to_string(),
            history: Vec::new(),
            tally: Tally::default(),
            input: String::new(),
            human_side,
            finished: false,
            session_closed: false,
        }
    }

    /// The mirrored board.
    pub fn board(&self) -> &BoardState {
        &self.board
    }

    /// The current status line.
    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// The mirrored move history.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// The running tally.
    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    /// The human's input line so far.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The human's side, when one exists.
    pub fn human_side(&self) -> Option<Side> {
        self.human_side
    }

    /// Whether the final game has ended.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Whether the session has stopped sending events.
    pub fn session_closed(&self) -> bool {
        self.session_closed
    }

    /// Marks the event channel as closed.
    pub fn set_session_closed(&mut self) {
        self.session_closed = true;
    }

    /// Handles a session event.
    pub fn handle_event(&mut self, event: MatchEvent) {
        debug!(?event, "Handling match event");

        match event {
            MatchEvent::GameStarted { game, fen } => {
                self.apply_fen(&fen);
                self.history.clear();
                self.finished = false;
                self.status_message = format!("Game {} started. White to move.", game);
            }
            MatchEvent::Thinking { side, player } => {
                if self.human_side == Some(side) {
                    self.status_message =
                        format!("Your move ({}). Type a move like e2e4 and press Enter.", side);
                } else {
                    self.status_message = format!("{} ({}) is thinking...", player, side);
                }
            }
            MatchEvent::TurnCompleted {
                outcome,
                fen,
                history,
            } => {
                self.apply_fen(&fen);
                self.history = history;
                self.status_message = match outcome.resolution {
                    TurnResolution::MoveApplied(uci) => {
                        format!("{} plays {}", outcome.side, uci)
                    }
                    TurnResolution::Skipped => format!(
                        "{} exhausted {} attempts, turn skipped",
                        outcome.side, outcome.attempts
                    ),
                    TurnResolution::GameEnded => "Game ending...".to_string(),
                };
            }
            MatchEvent::GameOver { game, reason, tally } => {
                self.finished = true;
                self.tally = tally;
                let summary = match reason {
                    EndReason::Checkmate { winner } => format!("Checkmate! {} wins.", winner),
                    EndReason::Stalemate => "Stalemate.".to_string(),
                    EndReason::Draw => "It's a draw.".to_string(),
                    EndReason::Resigned { loser } => format!("{} gave up.", loser),
                    EndReason::Aborted => "Game aborted.".to_string(),
                };
                self.status_message =
                    format!("Game {} over. {} Press Esc to exit.", game, summary);
            }
        }
    }

    /// Translates a key press into a UI action.
    ///
    /// In training mode printable characters feed the input line, so Esc is
    /// the only quit key while a game is live; 'q' works once it is over.
    pub fn on_key(&mut self, key: KeyCode) -> KeyAction {
        if key == KeyCode::Esc {
            return KeyAction::Quit;
        }
        let typing = self.human_side.is_some() && !self.finished;
        if typing {
            match key {
                KeyCode::Char(c) => {
                    self.input.push(c);
                    KeyAction::None
                }
                KeyCode::Backspace => {
                    self.input.pop();
                    KeyAction::None
                }
                KeyCode::Enter => {
                    let line = std::mem::take(&mut self.input);
                    KeyAction::Submit(line)
                }
                _ => KeyAction::None,
            }
        } else {
            match key {
                KeyCode::Char('q') => KeyAction::Quit,
                _ => KeyAction::None,
            }
        }
    }

    fn apply_fen(&mut self, fen: &str) {
        match BoardState::from_fen(fen) {
            Ok(board) => self.board = board,
            Err(e) => debug!(error = %e, "Ignoring unreadable board snapshot"),
        }
    }
}

//! Board state wrapping the rules engine.
//!
//! All legality questions are delegated to `shakmaty`; this module owns the
//! live position, the move history, and terminal-status detection. The board
//! is mutated only through [`BoardState::apply`], [`BoardState::skip_turn`],
//! and [`BoardState::resign`], so the side to move alternates exactly as the
//! rules engine dictates.

use crate::notation::MoveCandidate;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{
    CastlingMode, Chess, Color, EnPassantMode, FromSetup, Move, Piece, Position, Square,
};
use std::collections::HashMap;

/// The side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The first-moving side.
    #[display("white")]
    White,
    /// The second-moving side.
    #[display("black")]
    Black,
}

impl Side {
    /// Returns the opposing side.
    pub fn other(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

/// Terminal status of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GameStatus {
    /// The game continues.
    Ongoing,
    /// The side to move has been mated.
    Checkmate {
        /// The mating side.
        winner: Side,
    },
    /// The side to move has no legal moves and is not in check.
    Stalemate,
    /// Drawn by insufficient material, the fifty-move rule, or threefold
    /// repetition.
    Draw,
    /// A side resigned or abandoned the game.
    Resigned {
        /// The side that gave up.
        loser: Side,
    },
}

impl GameStatus {
    /// Whether the game is over.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::Ongoing)
    }
}

/// A candidate move rejected by the rules engine.
#[derive(Debug, Clone, Display, Error)]
#[display("illegal move {} for {}", uci, side)]
pub struct IllegalMoveError {
    /// The rejected move in coordinate notation.
    pub uci: String,
    /// The side that proposed it.
    pub side: Side,
}

/// A turn could not be skipped because the flipped position is unplayable.
#[derive(Debug, Clone, Display, Error)]
#[display("cannot skip turn: {}", reason)]
pub struct SkipTurnError {
    /// Why the rules engine rejected the flipped position.
    pub reason: String,
}

/// A FEN string could not be turned into a playable position.
#[derive(Debug, Clone, Display, Error)]
#[display("invalid position: {}", reason)]
pub struct InvalidPositionError {
    /// The parse or setup failure.
    pub reason: String,
}

/// Owns the rules engine's position plus the applied move history.
#[derive(Debug, Clone)]
pub struct BoardState {
    pos: Chess,
    history: Vec<String>,
    resigned: Option<Side>,
    repetitions: HashMap<String, u32>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardState {
    /// Creates the standard starting position.
    pub fn new() -> Self {
        let pos = Chess::default();
        let mut repetitions = HashMap::new();
        repetitions.insert(repetition_key(&pos), 1);
        Self {
            pos,
            history: Vec::new(),
            resigned: None,
            repetitions,
        }
    }

    /// Builds a board from a FEN string, with an empty history.
    pub fn from_fen(fen: &str) -> Result<Self, InvalidPositionError> {
        let fen: Fen = fen.parse().map_err(|e| InvalidPositionError {
            reason: format!("{}", e),
        })?;
        let pos: Chess =
            fen.into_position(CastlingMode::Standard)
                .map_err(|e| InvalidPositionError {
                    reason: format!("{}", e),
                })?;
        let mut repetitions = HashMap::new();
        repetitions.insert(repetition_key(&pos), 1);
        Ok(Self {
            pos,
            history: Vec::new(),
            resigned: None,
            repetitions,
        })
    }

    /// The side whose turn it is.
    pub fn side_to_move(&self) -> Side {
        self.pos.turn().into()
    }

    /// The applied move history in coordinate notation, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// The current position as a FEN string.
    pub fn fen(&self) -> String {
        Fen::from_position(self.pos.clone(), EnPassantMode::Legal).to_string()
    }

    /// The piece on a square, if any.
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.pos.board().piece_at(square)
    }

    /// All legal moves for the side to move, in coordinate notation.
    pub fn legal_moves(&self) -> Vec<String> {
        self.pos
            .legal_moves()
            .iter()
            .map(|m| m.to_uci(CastlingMode::Standard).to_string())
            .collect()
    }

    /// Checks a parsed candidate against the legal-move set.
    ///
    /// The returned [`Move`] carries the engine-inferred semantics for
    /// castling, en passant, and promotion. This is the only legality
    /// boundary; no rules knowledge lives outside the engine.
    pub fn resolve(&self, candidate: &MoveCandidate) -> Result<Move, IllegalMoveError> {
        let uci = UciMove::Normal {
            from: candidate.from(),
            to: candidate.to(),
            promotion: candidate.promotion(),
        };
        uci.to_move(&self.pos).map_err(|_| IllegalMoveError {
            uci: candidate.to_string(),
            side: self.side_to_move(),
        })
    }

    /// Applies a resolved move, returning its coordinate notation.
    ///
    /// Flips the side to move and appends to the history. Callers obtain the
    /// move from [`BoardState::resolve`], so rejection here means the move
    /// was resolved against a different position.
    pub fn apply(&mut self, m: Move) -> Result<String, IllegalMoveError> {
        let side = self.side_to_move();
        let uci = m.to_uci(CastlingMode::Standard).to_string();
        let next = self
            .pos
            .clone()
            .play(&m)
            .map_err(|_| IllegalMoveError {
                uci: uci.clone(),
                side,
            })?;
        self.pos = next;
        self.history.push(uci.clone());
        *self
            .repetitions
            .entry(repetition_key(&self.pos))
            .or_insert(0) += 1;
        Ok(uci)
    }

    /// Passes the turn to the other side without moving.
    ///
    /// Rebuilds the position with the turn flipped and the en-passant square
    /// cleared. Fails when the stalled side is in check, since the flipped
    /// position would leave a capturable king.
    pub fn skip_turn(&mut self) -> Result<(), SkipTurnError> {
        let mut setup = self.pos.clone().into_setup(EnPassantMode::Legal);
        setup.turn = setup.turn.other();
        setup.ep_square = None;
        let next: Chess =
            Chess::from_setup(setup, CastlingMode::Standard).map_err(|e| SkipTurnError {
                reason: format!("{}", e),
            })?;
        self.pos = next;
        *self
            .repetitions
            .entry(repetition_key(&self.pos))
            .or_insert(0) += 1;
        Ok(())
    }

    /// Marks the game as abandoned by `side`.
    pub fn resign(&mut self, side: Side) {
        self.resigned = Some(side);
    }

    /// The terminal status of the current position.
    pub fn status(&self) -> GameStatus {
        if let Some(loser) = self.resigned {
            return GameStatus::Resigned { loser };
        }
        if self.pos.is_checkmate() {
            return GameStatus::Checkmate {
                winner: self.side_to_move().other(),
            };
        }
        if self.pos.is_stalemate() {
            return GameStatus::Stalemate;
        }
        if self.pos.is_insufficient_material()
            || self.pos.halfmoves() >= 100
            || self.threefold_repetition()
        {
            return GameStatus::Draw;
        }
        GameStatus::Ongoing
    }

    fn threefold_repetition(&self) -> bool {
        self.repetitions
            .get(&repetition_key(&self.pos))
            .is_some_and(|&n| n >= 3)
    }
}

/// Position identity for repetition counting: the FEN fields for piece
/// placement, turn, castling rights, and en-passant square, without the
/// move counters.
fn repetition_key(pos: &Chess) -> String {
    let fen = Fen::from_position(pos.clone(), EnPassantMode::Legal).to_string();
    fen.split_whitespace()
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::extract_move;

    fn candidate(text: &str) -> MoveCandidate {
        extract_move(text).expect("test move should parse")
    }

    #[test]
    fn starting_position_is_whites() {
        let board = BoardState::new();
        assert_eq!(board.side_to_move(), Side::White);
        assert_eq!(board.legal_moves().len(), 20);
        assert_eq!(board.status(), GameStatus::Ongoing);
    }

    #[test]
    fn apply_flips_side_and_records_history() {
        let mut board = BoardState::new();
        let m = board.resolve(&candidate("e2e4")).expect("e2e4 is legal");
        let uci = board.apply(m).expect("apply resolved move");
        assert_eq!(uci, "e2e4");
        assert_eq!(board.side_to_move(), Side::Black);
        assert_eq!(board.history(), ["e2e4".to_string()]);
    }

    #[test]
    fn resolve_rejects_moves_outside_legal_set() {
        let board = BoardState::new();
        // Pawns cannot advance three squares.
        let err = board.resolve(&candidate("d2d5")).unwrap_err();
        assert_eq!(err.side, Side::White);
        assert_eq!(err.uci, "d2d5");
        // Black's reply is not in White's legal set.
        assert!(board.resolve(&candidate("e7e5")).is_err());
    }

    #[test]
    fn fools_mate_is_checkmate_for_black() {
        let mut board = BoardState::new();
        for uci in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            let m = board.resolve(&candidate(uci)).expect("scripted move legal");
            board.apply(m).expect("apply");
        }
        assert_eq!(board.status(), GameStatus::Checkmate { winner: Side::Black });
    }

    #[test]
    fn stalemate_is_detected() {
        let board = BoardState::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").expect("valid fen");
        assert_eq!(board.status(), GameStatus::Stalemate);
    }

    #[test]
    fn fifty_move_rule_draws() {
        let mut board =
            BoardState::from_fen("8/8/8/8/8/4k3/8/4K2R w - - 99 80").expect("valid fen");
        let m = board.resolve(&candidate("h1h2")).expect("rook move legal");
        board.apply(m).expect("apply");
        assert_eq!(board.status(), GameStatus::Draw);
    }

    #[test]
    fn threefold_repetition_draws() {
        let mut board = BoardState::new();
        // Two full knight shuffles return to the start position twice over.
        for uci in [
            "g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8",
        ] {
            let m = board.resolve(&candidate(uci)).expect("shuffle move legal");
            board.apply(m).expect("apply");
        }
        assert_eq!(board.status(), GameStatus::Draw);
    }

    #[test]
    fn skip_turn_passes_to_other_side() {
        let mut board = BoardState::new();
        board.skip_turn().expect("skip from quiet position");
        assert_eq!(board.side_to_move(), Side::Black);
        // Black's own replies are legal from the flipped position.
        assert!(board.legal_moves().contains(&"e7e5".to_string()));
        assert_eq!(board.status(), GameStatus::Ongoing);
    }

    #[test]
    fn skip_turn_fails_when_stalled_side_in_check() {
        let mut board =
            BoardState::from_fen("4k3/8/8/8/8/8/4q3/4K3 w - - 0 1").expect("valid fen");
        assert!(board.skip_turn().is_err());
    }

    #[test]
    fn resignation_is_terminal() {
        let mut board = BoardState::new();
        board.resign(Side::Black);
        assert_eq!(board.status(), GameStatus::Resigned { loser: Side::Black });
    }
}

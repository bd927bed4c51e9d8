//! Prompt construction for model turns.

use crate::board::BoardState;

/// Builds the strict move-request prompt for the current position.
///
/// The wording is deliberately blunt: small local models drift into
/// commentary unless told exactly once, in caps, not to.
pub fn build_prompt(board: &BoardState) -> String {
    format!(
        "Chess state: {fen}\n\
         Move history: {history}\n\
         Legal moves: {legal}\n\
         \n\
         IMPORTANT INSTRUCTIONS:\n\
         Output ONLY one line containing exactly one valid UCI move from the list above.\n\
         Do NOT provide any commentary, text, or explanation.\n\
         Example: e2e4\n\
         \n\
         Please provide your UCI move now:",
        fen = board.fen(),
        history = board.history().join(" "),
        legal = board.legal_moves().join(", "),
    )
}

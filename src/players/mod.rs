//! Move providers: where raw move text comes from.
//!
//! The turn controller only ever sees [`MoveProvider`], so the state machine
//! is exercised in tests with scripted replies instead of live subprocesses.

mod human;
mod model;
mod scripted;

pub use human::HumanPlayer;
pub use model::ModelPlayer;
pub use scripted::{ScriptedPlayer, ScriptedReply};

use crate::board::BoardState;
use crate::model_client::TransportError;

/// What a provider produced for one attempt.
#[derive(Debug)]
pub enum ProviderReply {
    /// Raw text, with the prompt and stderr captured for the session log.
    Text {
        /// The prompt sent to the model, absent for human input.
        prompt: Option<String>,
        /// The raw response text.
        raw: String,
        /// Captured stderr, when the runtime produced any.
        stderr: Option<String>,
    },
    /// The invocation failed before producing usable text.
    Transport {
        /// The prompt that was being sent, absent when spawning failed early.
        prompt: Option<String>,
        /// The transport failure.
        error: TransportError,
    },
    /// The input source is gone; the game cannot continue.
    Disconnected,
}

/// A source of raw move text for one side.
#[async_trait::async_trait]
pub trait MoveProvider: Send {
    /// Obtains raw text for the current position.
    ///
    /// Blocks (asynchronously) until the provider answers; the controller
    /// never has more than one outstanding call.
    async fn provide(&mut self, board: &BoardState) -> ProviderReply;

    /// The provider's display name, used as the actor in the session log.
    fn name(&self) -> &str;

    /// Whether failures should end the game instead of retrying.
    fn is_human(&self) -> bool {
        false
    }
}

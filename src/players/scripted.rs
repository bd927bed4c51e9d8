//! Deterministic provider for exercising the turn controller.

use super::{MoveProvider, ProviderReply};
use crate::board::BoardState;
use crate::model_client::TransportError;
use std::collections::VecDeque;

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this text as the raw response.
    Text(String),
    /// Fail the attempt with a transport timeout.
    Transport,
}

/// A provider that replays a fixed sequence of answers.
///
/// Once the script runs out it reports [`ProviderReply::Disconnected`],
/// which ends the game, so tests terminate even when the scripted game
/// does not.
pub struct ScriptedPlayer {
    name: String,
    replies: VecDeque<ScriptedReply>,
    human: bool,
}

impl ScriptedPlayer {
    /// A scripted model-controlled side.
    pub fn model(name: impl Into<String>, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            name: name.into(),
            replies: replies.into_iter().collect(),
            human: false,
        }
    }

    /// A scripted human-controlled side (failures end the game).
    pub fn human(name: impl Into<String>, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            name: name.into(),
            replies: replies.into_iter().collect(),
            human: true,
        }
    }

    /// Convenience: scripted text replies only.
    pub fn with_texts(
        name: impl Into<String>,
        texts: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        Self::model(
            name,
            texts
                .into_iter()
                .map(|t| ScriptedReply::Text(t.to_string())),
        )
    }
}

#[async_trait::async_trait]
impl MoveProvider for ScriptedPlayer {
    async fn provide(&mut self, _board: &BoardState) -> ProviderReply {
        match self.replies.pop_front() {
            Some(ScriptedReply::Text(raw)) => ProviderReply::Text {
                prompt: None,
                raw,
                stderr: None,
            },
            Some(ScriptedReply::Transport) => ProviderReply::Transport {
                prompt: None,
                error: TransportError::Timeout { secs: 0 },
            },
            None => ProviderReply::Disconnected,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_human(&self) -> bool {
        self.human
    }
}

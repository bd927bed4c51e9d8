//! Human provider fed by the terminal input line.

use super::{MoveProvider, ProviderReply};
use crate::board::BoardState;
use tokio::sync::mpsc;

/// A side played by the person at the keyboard.
///
/// The TUI pushes each submitted input line into the channel; this provider
/// simply waits for the next one. A closed channel means the UI is gone and
/// the game should end.
pub struct HumanPlayer {
    name: String,
    input_rx: mpsc::UnboundedReceiver<String>,
}

impl HumanPlayer {
    /// Creates a human player reading from `input_rx`.
    pub fn new(name: impl Into<String>, input_rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            name: name.into(),
            input_rx,
        }
    }
}

#[async_trait::async_trait]
impl MoveProvider for HumanPlayer {
    async fn provide(&mut self, _board: &BoardState) -> ProviderReply {
        match self.input_rx.recv().await {
            Some(raw) => ProviderReply::Text {
                prompt: None,
                raw,
                stderr: None,
            },
            None => ProviderReply::Disconnected,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_human(&self) -> bool {
        true
    }
}

//! Model-controlled provider backed by the subprocess client.

use super::{MoveProvider, ProviderReply};
use crate::board::BoardState;
use crate::model_client::ModelClient;
use crate::prompt;
use tracing::{debug, instrument};

/// A side played by an external language model.
pub struct ModelPlayer {
    client: ModelClient,
}

impl ModelPlayer {
    /// Creates a player around a configured client.
    pub fn new(client: ModelClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl MoveProvider for ModelPlayer {
    #[instrument(skip(self, board), fields(model = %self.client.model()))]
    async fn provide(&mut self, board: &BoardState) -> ProviderReply {
        let prompt = prompt::build_prompt(board);
        debug!(prompt_len = prompt.len(), "Requesting move from model");
        match self.client.invoke(&prompt).await {
            Ok(output) => ProviderReply::Text {
                prompt: Some(prompt),
                raw: output.stdout,
                stderr: (!output.stderr.is_empty()).then_some(output.stderr),
            },
            Err(error) => ProviderReply::Transport {
                prompt: Some(prompt),
                error,
            },
        }
    }

    fn name(&self) -> &str {
        self.client.model()
    }
}

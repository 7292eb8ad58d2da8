pub mod gemini;

use crate::chat::Turn;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use gemini::GeminiProvider;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: 1024,
            temperature: 0.7,
        }
    }
}

/// Provider-side context a session is bound to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    pub system_instruction: String,
    pub generation: GenerationOptions,
}

/// A generative-language backend: start a conversation, then exchange text.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    fn start_conversation(&self) -> Result<Conversation, ProviderError>;

    /// Sends `text` after `history` and returns the reply text.
    async fn send(
        &self,
        conversation: &Conversation,
        history: &[Turn],
        text: &str,
    ) -> Result<String, ProviderError>;
}

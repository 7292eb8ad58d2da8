use crate::{
    chat::{history_messages, ChatMessage, Turn},
    error::{ChatError, ProviderError, Result},
    fallback::{FallbackReplies, SERVER_REPLIES},
    provider::{ChatProvider, Conversation},
    store::SessionStore,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

pub const WELCOME_MESSAGE: &str = "Hi! I'm your AI fitness assistant powered by Google Gemini. Ask me anything about workouts, nutrition, or fitness! 💪";

#[derive(Debug, Clone)]
pub struct StartedSession {
    pub session_id: String,
    pub welcome: ChatMessage,
}

/// Result of relaying one message. `offline` means the text came from the
/// fallback table, not the model.
#[derive(Debug, Clone)]
pub struct Reply {
    pub message: ChatMessage,
    pub offline: bool,
}

/// Relays chat messages between clients and the language model.
pub struct ChatRelay {
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn ChatProvider>,
    fallback: FallbackReplies,
    provider_timeout: Duration,
}

impl ChatRelay {
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn ChatProvider>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            fallback: SERVER_REPLIES,
            provider_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn start_session(&self) -> Result<StartedSession> {
        let conversation = self
            .provider
            .start_conversation()
            .map_err(ChatError::SessionStart)?;

        let session = self.store.create(conversation);
        info!("Started chat session {}", session.id);

        Ok(StartedSession {
            session_id: session.id,
            welcome: ChatMessage::bot(WELCOME_MESSAGE),
        })
    }

    pub async fn send_message(&self, session_id: &str, text: &str) -> Result<Reply> {
        if session_id.trim().is_empty() || text.trim().is_empty() {
            return Err(ChatError::Validation(
                "Session ID and message are required".into(),
            ));
        }

        let session = self
            .store
            .get(session_id)
            .ok_or_else(|| ChatError::NotFound(session_id.to_string()))?;

        match self.ask_provider(&session.conversation, &session.turns, text).await {
            Ok(reply) => {
                self.store.record_exchange(
                    session_id,
                    vec![Turn::user(text), Turn::assistant(reply.clone())],
                )?;
                debug!("Relayed reply for session {}", session_id);

                Ok(Reply {
                    message: ChatMessage::bot(reply),
                    offline: false,
                })
            }
            Err(e) => {
                warn!(
                    "{} failed for session {}, using fallback: {}",
                    self.provider.name(),
                    session_id,
                    e
                );
                self.store.touch(session_id);

                Ok(Reply {
                    message: ChatMessage::bot(self.fallback.reply_for(text)),
                    offline: true,
                })
            }
        }
    }

    async fn ask_provider(
        &self,
        conversation: &Conversation,
        history: &[Turn],
        text: &str,
    ) -> std::result::Result<String, ProviderError> {
        tokio::time::timeout(
            self.provider_timeout,
            self.provider.send(conversation, history, text),
        )
        .await
        .map_err(|_| ProviderError::Timeout(self.provider_timeout))?
    }

    pub fn history(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let session = self
            .store
            .get(session_id)
            .ok_or_else(|| ChatError::NotFound(session_id.to_string()))?;
        Ok(history_messages(&session.turns))
    }

    pub fn delete_session(&self, session_id: &str) -> bool {
        let removed = self.store.delete(session_id);
        if removed {
            info!("Cleared chat session {}", session_id);
        }
        removed
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Who produced a turn, from the provider's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// Who a message is displayed as coming from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl From<TurnRole> for Sender {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Sender::User,
            TurnRole::Assistant => Sender::Bot,
        }
    }
}

/// One stored unit of conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, text)
    }
}

/// A message as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: next_message_id(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Bot)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }
}

/// Maps stored turns to display messages, keeping order.
///
/// Ids are the turn's position in the history, so repeated reads of the same
/// session yield the same ids.
pub fn history_messages(turns: &[Turn]) -> Vec<ChatMessage> {
    turns
        .iter()
        .enumerate()
        .map(|(index, turn)| ChatMessage {
            id: index as u64,
            text: turn.text.clone(),
            sender: turn.role.into(),
            timestamp: turn.timestamp,
        })
        .collect()
}

static LAST_MESSAGE_ID: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp id, bumped past the previous one so two messages
/// created in the same millisecond still differ.
pub fn next_message_id() -> u64 {
    let now = Utc::now().timestamp_millis().max(0) as u64;
    let mut last = LAST_MESSAGE_ID.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_MESSAGE_ID.compare_exchange_weak(
            last,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(current) => last = current,
        }
    }
}

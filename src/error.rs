use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),

    #[error("Chat session not found: {0}")]
    NotFound(String),

    #[error("Failed to start chat session: {0}")]
    SessionStart(#[source] ProviderError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Failure talking to the language model. Always recoverable.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("provider request failed: {0}")]
    Request(reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL may carry credentials
        ProviderError::Request(e.without_url())
    }
}

pub type Result<T, E = ChatError> = std::result::Result<T, E>;

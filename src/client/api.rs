use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::http::{SendMessageResponse, StartChatResponse};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server answered {0}")]
    Status(u16),

    #[error("no active chat session")]
    NoSession,
}

/// Transport the conversation controller talks through.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn start_session(&self) -> Result<StartChatResponse, ClientError>;

    async fn send_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<SendMessageResponse, ClientError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError>;
}

/// `ChatApi` over the relay's JSON HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpChatApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(130))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(ClientError::Status(resp.status().as_u16()))
        }
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn start_session(&self) -> Result<StartChatResponse, ClientError> {
        let resp = self.client.post(self.url("/api/chat/start")).send().await?;
        Ok(Self::check(resp)?.json().await?)
    }

    async fn send_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<SendMessageResponse, ClientError> {
        let resp = self
            .client
            .post(self.url("/api/chat/message"))
            .json(&json!({ "sessionId": session_id, "message": text }))
            .send()
            .await?;
        Ok(Self::check(resp)?.json().await?)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .delete(self.url(&format!("/api/chat/{session_id}")))
            .send()
            .await?;
        Self::check(resp)?;
        Ok(())
    }
}

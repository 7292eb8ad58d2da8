//! End-to-end tests: a real listener on 127.0.0.1:0 with a stub language
//! model, driven through the HTTP client and the conversation controller.

use async_trait::async_trait;
use flex_assistant::chat::{Sender, Turn};
use flex_assistant::client::{ChatApi, ControllerState, ConversationController, HttpChatApi};
use flex_assistant::error::ProviderError;
use flex_assistant::fallback::{CLIENT_REPLIES, SERVER_REPLIES};
use flex_assistant::http::{self, AppState, HistoryResponse};
use flex_assistant::provider::{ChatProvider, Conversation};
use flex_assistant::relay::ChatRelay;
use flex_assistant::store::{MemorySessionStore, SessionStore};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

struct CoachProvider;

#[async_trait]
impl ChatProvider for CoachProvider {
    fn name(&self) -> &str {
        "coach"
    }

    fn start_conversation(&self) -> Result<Conversation, ProviderError> {
        Ok(Conversation::default())
    }

    async fn send(
        &self,
        _conversation: &Conversation,
        history: &[Turn],
        text: &str,
    ) -> Result<String, ProviderError> {
        Ok(format!("coach #{}: {}", history.len() / 2 + 1, text))
    }
}

struct DownProvider;

#[async_trait]
impl ChatProvider for DownProvider {
    fn name(&self) -> &str {
        "down"
    }

    fn start_conversation(&self) -> Result<Conversation, ProviderError> {
        Ok(Conversation::default())
    }

    async fn send(
        &self,
        _conversation: &Conversation,
        _history: &[Turn],
        _text: &str,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::Malformed("connection reset".into()))
    }
}

struct Server {
    base_url: String,
    store: Arc<dyn SessionStore>,
}

async fn spawn_server(provider: Arc<dyn ChatProvider>) -> Server {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let state = Arc::new(AppState {
        relay: ChatRelay::new(store.clone(), provider, Duration::from_secs(5)),
        expose_error_details: true,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, http::router(state)).await.unwrap();
    });

    Server {
        base_url: format!("http://{addr}"),
        store,
    }
}

#[tokio::test]
async fn offline_reply_when_model_is_down() {
    let server = spawn_server(Arc::new(DownProvider)).await;
    let api = HttpChatApi::new(&server.base_url).unwrap();

    let started = api.start_session().await.unwrap();
    assert_eq!(started.message.sender, Sender::Bot);

    let reply = api
        .send_message(&started.session_id, "Can you suggest a workout?")
        .await
        .unwrap();

    assert!(reply.is_offline);
    assert_eq!(reply.message.text, SERVER_REPLIES.workout);
}

#[tokio::test]
async fn empty_message_is_rejected_without_mutation() {
    let server = spawn_server(Arc::new(CoachProvider)).await;
    let api = HttpChatApi::new(&server.base_url).unwrap();
    let id = api.start_session().await.unwrap().session_id;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/chat/message", server.base_url))
        .json(&json!({ "sessionId": id, "message": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
    assert!(server.store.get(&id).unwrap().turns.is_empty());
}

#[tokio::test]
async fn history_alternates_user_and_bot() {
    let server = spawn_server(Arc::new(CoachProvider)).await;
    let api = HttpChatApi::new(&server.base_url).unwrap();
    let id = api.start_session().await.unwrap().session_id;

    api.send_message(&id, "How many sets?").await.unwrap();
    api.send_message(&id, "And reps?").await.unwrap();

    let history: HistoryResponse = reqwest::get(format!(
        "{}/api/chat/history/{}",
        server.base_url, id
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

    let texts: Vec<&str> = history.history.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["How many sets?", "coach #1: How many sets?", "And reps?", "coach #2: And reps?"]
    );
    let senders: Vec<Sender> = history.history.iter().map(|m| m.sender).collect();
    assert_eq!(
        senders,
        vec![Sender::User, Sender::Bot, Sender::User, Sender::Bot]
    );
}

#[tokio::test]
async fn delete_twice_then_send_is_not_found() {
    let server = spawn_server(Arc::new(CoachProvider)).await;
    let api = HttpChatApi::new(&server.base_url).unwrap();
    let id = api.start_session().await.unwrap().session_id;

    api.delete_session(&id).await.unwrap();
    assert!(api.delete_session(&id).await.is_err());
    assert!(api.send_message(&id, "still there?").await.is_err());
}

#[tokio::test]
async fn concurrent_starts_get_distinct_sessions() {
    let server = spawn_server(Arc::new(CoachProvider)).await;
    let api = HttpChatApi::new(&server.base_url).unwrap();

    let starts = futures::future::join_all((0..32).map(|_| api.start_session())).await;
    let ids: HashSet<String> = starts.into_iter().map(|s| s.unwrap().session_id).collect();

    assert_eq!(ids.len(), 32);
    assert_eq!(server.store.len(), 32);
}

#[tokio::test]
async fn controller_talks_to_live_server() {
    let server = spawn_server(Arc::new(CoachProvider)).await;
    let mut controller =
        ConversationController::new(HttpChatApi::new(&server.base_url).unwrap());

    controller.mount().await;
    assert_eq!(controller.state(), ControllerState::Ready);
    assert!(controller.view().api_available);
    let first_session = controller.view().session_id.clone().unwrap();

    controller.set_input("Plan my leg day");
    assert!(controller.submit().await);
    assert_eq!(
        controller.view().messages.last().unwrap().text,
        "coach #1: Plan my leg day"
    );

    controller.clear().await;
    let second_session = controller.view().session_id.clone().unwrap();
    assert_ne!(first_session, second_session);
    assert!(server.store.get(&first_session).is_none());
    assert_eq!(controller.view().messages.len(), 1);
}

#[tokio::test]
async fn controller_degrades_when_server_is_gone() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut controller =
        ConversationController::new(HttpChatApi::new(format!("http://{addr}")).unwrap());
    controller.mount().await;
    assert!(!controller.view().api_available);

    controller.set_input("what about my diet?");
    controller.submit().await;

    assert_eq!(
        controller.view().messages.last().unwrap().text,
        CLIENT_REPLIES.diet
    );
    assert_eq!(controller.state(), ControllerState::Ready);
}

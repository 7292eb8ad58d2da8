//! HTTP surface of the chat relay.
//!
//! Endpoints:
//! - GET    /health
//! - POST   /api/chat/start
//! - POST   /api/chat/message
//! - GET    /api/chat/history/:session_id
//! - DELETE /api/chat/:session_id

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::{chat::ChatMessage, error::ChatError, relay::ChatRelay};

pub struct AppState {
    pub relay: ChatRelay,
    pub expose_error_details: bool,
}

impl AppState {
    fn reject(&self, error: ChatError) -> ApiError {
        ApiError {
            error,
            expose_details: self.expose_error_details,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat/start", post(start_chat))
        .route("/api/chat/message", post(send_message))
        .route("/api/chat/history/:session_id", get(history))
        .route("/api/chat/:session_id", delete(clear_chat))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

// -----------------------------------------------------------------------------
// Request / response bodies
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartChatResponse {
    pub session_id: String,
    pub message: ChatMessage,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub message: ChatMessage,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_offline: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<ChatMessage>,
}

// -----------------------------------------------------------------------------
// Errors
// -----------------------------------------------------------------------------

pub struct ApiError {
    error: ChatError,
    expose_details: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self.error {
            ChatError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            ChatError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "Chat session not found. Please start a new session.".to_string(),
                None,
            ),
            ChatError::SessionStart(e) => {
                error!("Error starting chat session: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to start chat session".to_string(),
                    Some(e.to_string()),
                )
            }
            ChatError::Internal(e) => {
                error!("Unhandled error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(format!("{e:#}")),
                )
            }
        };

        let mut body = json!({ "error": message });
        if let Some(details) = details.filter(|_| self.expose_details) {
            body["details"] = json!(details);
        }
        (status, Json(body)).into_response()
    }
}

// -----------------------------------------------------------------------------
// Handlers
// -----------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "OK",
        "message": "Gemini Fitness Assistant API is running!"
    }))
}

async fn start_chat(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StartChatResponse>, ApiError> {
    let started = state.relay.start_session().map_err(|e| state.reject(e))?;
    Ok(Json(StartChatResponse {
        session_id: started.session_id,
        message: started.welcome,
    }))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let Json(request) = payload
        .map_err(|e| state.reject(ChatError::Validation(format!("Invalid request body: {e}"))))?;

    let session_id = request.session_id.unwrap_or_default();
    let text = request.message.unwrap_or_default();

    let reply = state
        .relay
        .send_message(&session_id, &text)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(SendMessageResponse {
        message: reply.message,
        is_offline: reply.offline,
    }))
}

async fn history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state
        .relay
        .history(&session_id)
        .map_err(|e| state.reject(e))?;
    Ok(Json(HistoryResponse { history }))
}

async fn clear_chat(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.relay.delete_session(&session_id) {
        Ok(Json(json!({ "message": "Chat session cleared successfully" })))
    } else {
        Err(state.reject(ChatError::NotFound(session_id)))
    }
}

//! Request handlers and wire schemas for the HTTP API.
use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use super::AppState;
use crate::error::RagError;
use crate::session::SessionStatus;

/// Inclusive bounds on `message`, counted in characters.
pub const MESSAGE_MIN_CHARS: usize = 1;
pub const MESSAGE_MAX_CHARS: usize = 1000;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub sources: Vec<String>,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Failures a handler can return.
#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(String),
    Rag(RagError),
}

impl From<RagError> for ApiError {
    fn from(e: RagError) -> Self {
        Self::Rag(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match self {
            Self::InvalidRequest(detail) => {
                (StatusCode::BAD_REQUEST, "Invalid request".to_string(), detail)
            }
            Self::Rag(RagError::NotReady) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
                "The knowledge base is still loading, please retry shortly".to_string(),
            ),
            Self::Rag(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                format!("An error occurred while processing your request: {e}"),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error,
                detail: Some(detail),
            }),
        )
            .into_response()
    }
}

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the folio-rag assistant API",
        "version": VERSION,
        "health": "/api/health",
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = match state.session.status().await {
        SessionStatus::Ready => "healthy",
        SessionStatus::Uninitialized | SessionStatus::Initializing => "initializing",
        SessionStatus::Failed(_) => "unavailable",
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: VERSION.to_string(),
        environment: state.session.config().app.environment.clone(),
    })
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;

    let length = request.message.chars().count();
    if !(MESSAGE_MIN_CHARS..=MESSAGE_MAX_CHARS).contains(&length) {
        return Err(ApiError::InvalidRequest(format!(
            "message must be between {MESSAGE_MIN_CHARS} and {MESSAGE_MAX_CHARS} characters, got {length}"
        )));
    }

    let session_id = request
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let answer = state.session.answer(&request.message).await.map_err(|e| {
        error!(error = %e, %session_id, "chat request failed");
        ApiError::from(e)
    })?;
    info!(%session_id, sources = answer.sources.len(), "chat answered");

    Ok(Json(ChatResponse {
        response: answer.answer,
        sources: answer.sources,
        session_id,
    }))
}

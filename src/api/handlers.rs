//! HTTP request handlers

use super::card::AgentCard;
use super::sse::turn_stream;
use super::types::{ErrorResponse, MessageRequest, MessageResponse};
use super::AppState;
use crate::agent::{AgentError, TaskStatus};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Discovery
        .route("/.well-known/agent.json", get(get_agent_card))
        .route("/.well-known/agent-card.json", get(get_agent_card))
        // Turns
        .route("/message/send", post(send_message))
        .route("/message/stream", post(stream_message))
        .route("/version", get(get_version))
        .with_state(state)
}

async fn get_agent_card(State(state): State<AppState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

/// Ids for one request: the session it belongs to and a fresh task id
fn task_ids(req: &MessageRequest) -> Result<(String, String), AppError> {
    if req.text.is_empty() {
        return Err(AppError::BadRequest("Message text must not be empty".to_string()));
    }
    let context_id = req
        .context_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    Ok((uuid::Uuid::new_v4().to_string(), context_id))
}

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let (task_id, context_id) = task_ids(&req)?;
    tracing::info!(task_id = %task_id, context_id = %context_id, "Running turn");

    let mut turn = Box::pin(state.agent.run_turn(context_id.clone(), req.text));
    let mut last = None;
    while let Some(item) = turn.next().await {
        last = Some(item?);
    }

    let progress = last
        .filter(|p| p.is_terminal())
        .ok_or_else(|| AppError::Internal("Turn ended without a result".to_string()))?;

    Ok(Json(MessageResponse {
        task_id,
        context_id,
        status: progress.task_status().unwrap_or(TaskStatus::Error),
        message: progress.content,
    }))
}

async fn stream_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<Response, AppError> {
    let (task_id, context_id) = task_ids(&req)?;
    tracing::info!(task_id = %task_id, context_id = %context_id, "Streaming turn");

    let turn = state.agent.run_turn(context_id.clone(), req.text);
    Ok(turn_stream(task_id, context_id, turn).into_response())
}

async fn get_version() -> &'static str {
    concat!("calc-greeting-agent ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    BadGateway(String),
    Internal(String),
}

impl From<AgentError> for AppError {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::EmptyInput => AppError::BadRequest(e.to_string()),
            AgentError::Backend(_) => AppError::BadGateway(e.to_string()),
            AgentError::Store(_) | AgentError::Transition(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Request failed");
        }

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

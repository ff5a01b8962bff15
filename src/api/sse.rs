//! Server-Sent Events for streamed turns

use super::types::StatusUpdate;
use crate::agent::{AgentError, ProgressEvent};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;

/// Turn a progress stream into an SSE response
pub fn turn_stream(
    task_id: String,
    context_id: String,
    turn: impl Stream<Item = Result<ProgressEvent, AgentError>> + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = turn.map(move |item| {
        Ok(match item {
            Ok(progress) => status_event(&StatusUpdate::new(&task_id, &context_id, &progress)),
            Err(e) => {
                tracing::error!(
                    task_id = %task_id,
                    context_id = %context_id,
                    error = %e,
                    "Streamed turn failed"
                );
                error_event(&task_id, &e)
            }
        })
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn status_event(update: &StatusUpdate) -> Event {
    let data = serde_json::to_value(update).unwrap_or_else(|_| json!({}));
    Event::default().event("status_update").data(data.to_string())
}

fn error_event(task_id: &str, error: &AgentError) -> Event {
    let data = json!({
        "task_id": task_id,
        "state": "failed",
        "error": error.to_string(),
        "final": true
    });
    Event::default().event("error").data(data.to_string())
}

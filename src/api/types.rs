//! API request and response types

use crate::agent::{ProgressEvent, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `/message/send` and `/message/stream`
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
    /// Session to continue; a new one is started when absent
    #[serde(default)]
    pub context_id: Option<String>,
}

/// Outcome of a completed `/message/send` turn
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub task_id: String,
    pub context_id: String,
    pub status: TaskStatus,
    pub message: String,
}

/// Task state as reported on the event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Working,
    Completed,
    InputRequired,
    Failed,
}

impl From<&ProgressEvent> for TaskState {
    fn from(progress: &ProgressEvent) -> Self {
        match progress.task_status() {
            None => TaskState::Working,
            Some(TaskStatus::Completed) => TaskState::Completed,
            Some(TaskStatus::InputRequired) => TaskState::InputRequired,
            Some(TaskStatus::Error) => TaskState::Failed,
        }
    }
}

/// One `status_update` SSE payload
#[derive(Debug, Serialize)]
pub struct StatusUpdate {
    pub task_id: String,
    pub context_id: String,
    pub state: TaskState,
    pub message: String,
    #[serde(rename = "final")]
    pub is_final: bool,
    pub timestamp: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn new(task_id: &str, context_id: &str, progress: &ProgressEvent) -> Self {
        Self {
            task_id: task_id.to_string(),
            context_id: context_id.to_string(),
            state: TaskState::from(progress),
            message: progress.content.clone(),
            is_final: progress.is_terminal(),
            timestamp: Utc::now(),
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

//! Progress records streamed to the caller during a turn

use serde::{Deserialize, Serialize};

pub const PERFORMING_CALCULATION: &str = "Performing calculation...";
pub const PREPARING_GREETING: &str = "Preparing greeting...";
pub const PROCESSING_RESULT: &str = "Processing result...";

/// One element of a turn's progress stream.
///
/// Intermediate records have both flags false. The terminal record, always
/// the last element, has exactly one flag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub is_task_complete: bool,
    pub require_user_input: bool,
    pub content: String,
}

impl ProgressEvent {
    pub fn working(content: impl Into<String>) -> Self {
        Self {
            is_task_complete: false,
            require_user_input: false,
            content: content.into(),
        }
    }

    pub fn completed(content: impl Into<String>) -> Self {
        Self {
            is_task_complete: true,
            require_user_input: false,
            content: content.into(),
        }
    }

    pub fn input_required(content: impl Into<String>) -> Self {
        Self {
            is_task_complete: false,
            require_user_input: true,
            content: content.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.is_task_complete || self.require_user_input
    }

    /// Status carried by a terminal record; `None` for intermediate ones
    pub fn task_status(&self) -> Option<TaskStatus> {
        match (self.is_task_complete, self.require_user_input) {
            (true, false) => Some(TaskStatus::Completed),
            (false, true) => Some(TaskStatus::InputRequired),
            (false, false) => None,
            (true, true) => Some(TaskStatus::Error),
        }
    }
}

/// Outcome of a turn as reported to the protocol layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    InputRequired,
    /// The turn failed, or produced a record that breaks the flag invariant
    Error,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::InputRequired => "input_required",
            TaskStatus::Error => "error",
        }
    }
}

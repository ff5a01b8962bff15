//! Conversation history for a session (context)
//!
//! A session is an append-only list of [`Message`]s keyed by an opaque
//! context id. The most recent message drives the next decision.

mod store;

pub use store::{InMemorySessionStore, SessionStore, StoreError, TurnLock};

use crate::llm::{ContentBlock, LlmMessage, MessageRole};
use crate::tools::ToolInput;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool call from the LLM: the arguments exactly as sent, plus their
/// typed reading used for dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub arguments: Value,
    pub input: ToolInput,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: &str, arguments: Value) -> Self {
        Self {
            id: id.into(),
            input: ToolInput::from_name_and_value(name, arguments.clone()),
            arguments,
        }
    }

    /// Get the tool name
    pub fn name(&self) -> &str {
        self.input.tool_name()
    }

    /// Arguments as the model sent them, replayed verbatim in history
    pub fn arguments(&self) -> &Value {
        &self.arguments
    }
}

/// One entry of a session's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    User {
        text: String,
    },
    Agent {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        tool_use_id: String,
        tool_name: String,
        content: String,
    },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::User { text: text.into() }
    }

    pub fn agent(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Agent {
            text: text.into(),
            tool_calls,
        }
    }

    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Message::ToolResult {
            tool_use_id: call.id.clone(),
            tool_name: call.name().to_string(),
            content: content.into(),
        }
    }

    /// Final answer text, if this is an agent message with something to say
    pub fn agent_text(&self) -> Option<&str> {
        match self {
            Message::Agent { text, .. } if !text.is_empty() => Some(text),
            _ => None,
        }
    }

    fn to_llm_message(&self) -> LlmMessage {
        match self {
            Message::User { text } => LlmMessage {
                role: MessageRole::User,
                content: vec![ContentBlock::text(text.clone())],
            },
            Message::Agent { text, tool_calls } => {
                let mut content = Vec::with_capacity(tool_calls.len() + 1);
                if !text.is_empty() {
                    content.push(ContentBlock::text(text.clone()));
                }
                content.extend(
                    tool_calls
                        .iter()
                        .map(|call| {
                            ContentBlock::tool_use(&call.id, call.name(), call.arguments().clone())
                        }),
                );
                LlmMessage {
                    role: MessageRole::Assistant,
                    content,
                }
            }
            Message::ToolResult {
                tool_use_id,
                content,
                ..
            } => LlmMessage {
                role: MessageRole::User,
                content: vec![ContentBlock::tool_result(tool_use_id, content.clone())],
            },
        }
    }
}

/// Build the model-facing view of a session's history
pub fn to_llm_messages(history: &[Message]) -> Vec<LlmMessage> {
    history.iter().map(Message::to_llm_message).collect()
}

/// Tool calls on the last agent message that never got a result.
///
/// Non-empty only when a turn was dropped between the model asking for a
/// tool and the result being recorded.
pub fn unanswered_tool_calls(history: &[Message]) -> Vec<&ToolCall> {
    let Some(agent_idx) = history
        .iter()
        .rposition(|m| matches!(m, Message::Agent { .. }))
    else {
        return Vec::new();
    };

    let Message::Agent { tool_calls, .. } = &history[agent_idx] else {
        return Vec::new();
    };

    let answered: Vec<&str> = history[agent_idx + 1..]
        .iter()
        .filter_map(|m| match m {
            Message::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
            _ => None,
        })
        .collect();

    tool_calls
        .iter()
        .filter(|call| !answered.contains(&call.id.as_str()))
        .collect()
}

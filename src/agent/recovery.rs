//! Repair of histories left behind by interrupted turns
//!
//! A turn dropped after the model asked for a tool but before the result was
//! recorded leaves an agent message whose calls have no matching result. The
//! model backend rejects such histories, so the next turn closes them first.

use crate::session::{unanswered_tool_calls, Message};

pub const INTERRUPTED_TOOL_CONTENT: &str = "Error: Tool call was interrupted before it completed";

/// Synthetic results for every unanswered tool call, in call order
pub fn interrupted_tool_results(history: &[Message]) -> Vec<Message> {
    unanswered_tool_calls(history)
        .into_iter()
        .map(|call| Message::tool_result(call, INTERRUPTED_TOOL_CONTENT))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ToolCall;
    use serde_json::json;

    fn greet_call() -> ToolCall {
        ToolCall::new("call-7", "get_greeting", json!({"name": "Ada"}))
    }

    #[test]
    fn test_clean_history_needs_nothing() {
        let call = greet_call();
        let history = vec![
            Message::user("Say hi to Ada"),
            Message::agent("", vec![call.clone()]),
            Message::tool_result(&call, "Hello Ada! Nice to meet you! 👋"),
            Message::agent("Hello Ada!", vec![]),
        ];
        assert!(interrupted_tool_results(&history).is_empty());
        assert!(interrupted_tool_results(&[]).is_empty());
    }

    #[test]
    fn test_interrupted_call_gets_error_result() {
        let call = greet_call();
        let history = vec![
            Message::user("Say hi to Ada"),
            Message::agent("", vec![call.clone()]),
        ];

        let repaired = interrupted_tool_results(&history);
        assert_eq!(
            repaired,
            vec![Message::tool_result(&call, INTERRUPTED_TOOL_CONTENT)]
        );
    }
}

//! Tools available to the agent
//!
//! The tool set is closed: every call the model makes is parsed into a
//! [`ToolInput`] variant with a typed argument record, and dispatch is an
//! exhaustive match. Calls that cannot be parsed keep their raw name and
//! arguments in [`ToolInput::Unknown`] so the model still gets a textual
//! error back instead of the turn failing.

mod calculator;
mod greeting;

pub use calculator::{calculator, CalculatorInput, Operation};
pub use greeting::{get_greeting, GreetingInput, DEFAULT_GREETING_NAME};

use crate::llm::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const CALCULATOR_TOOL: &str = "calculator";
pub const GREETING_TOOL: &str = "get_greeting";

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }
}

/// Strongly typed tool input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_tool", rename_all = "snake_case")]
pub enum ToolInput {
    Calculator(CalculatorInput),
    Greeting(GreetingInput),
    /// Fallback for unknown tools or arguments that failed to parse
    Unknown { name: String, input: Value },
}

impl ToolInput {
    /// Get the tool name as the model knows it
    pub fn tool_name(&self) -> &str {
        match self {
            ToolInput::Calculator(_) => CALCULATOR_TOOL,
            ToolInput::Greeting(_) => GREETING_TOOL,
            ToolInput::Unknown { name, .. } => name,
        }
    }

    /// Parse from tool name and JSON value
    pub fn from_name_and_value(name: &str, value: Value) -> Self {
        let parsed = match name {
            CALCULATOR_TOOL => serde_json::from_value(value.clone()).map(ToolInput::Calculator),
            GREETING_TOOL => serde_json::from_value(value.clone()).map(ToolInput::Greeting),
            _ => {
                return ToolInput::Unknown {
                    name: name.to_string(),
                    input: value,
                }
            }
        };

        parsed.unwrap_or_else(|e| {
            tracing::debug!(tool = %name, error = %e, "Tool arguments did not parse");
            ToolInput::Unknown {
                name: name.to_string(),
                input: value,
            }
        })
    }
}

/// Definitions of every tool, as sent to the model
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: CALCULATOR_TOOL.to_string(),
            description: "Perform basic math operations: add, subtract, multiply, or divide. \
                          Returns the result of the operation."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["operation", "a", "b"],
                "properties": {
                    "operation": {
                        "type": "string",
                        "enum": ["add", "subtract", "multiply", "divide"],
                        "description": "One of 'add', 'subtract', 'multiply', 'divide'"
                    },
                    "a": { "type": "number", "description": "First number" },
                    "b": { "type": "number", "description": "Second number" }
                }
            }),
        },
        ToolDefinition {
            name: GREETING_TOOL.to_string(),
            description: "Generate a friendly greeting for someone.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "The name of the person to greet",
                        "default": DEFAULT_GREETING_NAME
                    }
                }
            }),
        },
    ]
}

/// Execute a tool call.
///
/// Never fails: domain errors and unrecognized calls come back as
/// unsuccessful [`ToolOutput`]s whose text is fed to the model.
pub fn execute(input: &ToolInput) -> ToolOutput {
    match input {
        ToolInput::Calculator(args) => {
            let output = calculator(args);
            if output.starts_with("Error:") {
                ToolOutput::error(output)
            } else {
                ToolOutput::success(output)
            }
        }
        ToolInput::Greeting(args) => ToolOutput::success(get_greeting(args)),
        ToolInput::Unknown { name, .. } if name == CALCULATOR_TOOL || name == GREETING_TOOL => {
            ToolOutput::error(format!("Error: Invalid arguments for {name}"))
        }
        ToolInput::Unknown { name, .. } => ToolOutput::error(format!("Error: Unknown tool {name}")),
    }
}

//! Greeting tool

use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_GREETING_NAME: &str = "friend";

/// Input for the `get_greeting` tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreetingInput {
    #[serde(default = "default_name", deserialize_with = "name_or_default")]
    pub name: String,
}

impl Default for GreetingInput {
    fn default() -> Self {
        Self {
            name: default_name(),
        }
    }
}

fn default_name() -> String {
    DEFAULT_GREETING_NAME.to_string()
}

/// An explicit `null` name means the same as no name
fn name_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_name))
}

/// Generate a friendly greeting for someone
pub fn get_greeting(input: &GreetingInput) -> String {
    format!("Hello {}! Nice to meet you! 👋", input.name)
}

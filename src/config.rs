//! Process configuration: command line flags and environment
//!
//! `.env` is loaded by `main` before any of this runs, so values from it
//! show up as ordinary environment variables.

use crate::agent::DEFAULT_MAX_STEPS;
use crate::llm::DEFAULT_MODEL;
use clap::Parser;
use thiserror::Error;

#[derive(Parser, Debug, Clone)]
#[command(name = "calc-greeting-agent")]
#[command(about = "Calculator and greeting agent served over HTTP")]
pub struct Cli {
    /// Interface to bind
    #[arg(long, default_value = "localhost")]
    pub host: String,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY environment variable not set.")]
    MissingApiKey,
    #[error("AGENT_MAX_STEPS must be a positive integer, got {0:?}")]
    InvalidMaxSteps(String),
}

/// Model backend settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    /// Full chat-completions URL; `None` means the public endpoint
    pub base_url: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            api_key,
            model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: lookup("OPENAI_BASE_URL"),
        })
    }
}

/// Limits applied to every turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentConfig {
    /// Model requests allowed per turn
    pub max_steps: u32,
    pub max_tokens: Option<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_tokens: None,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let max_steps = match lookup("AGENT_MAX_STEPS") {
            None => DEFAULT_MAX_STEPS,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(steps) if steps >= 1 => steps,
                _ => return Err(ConfigError::InvalidMaxSteps(raw)),
            },
        };

        Ok(Self {
            max_steps,
            ..Self::default()
        })
    }
}

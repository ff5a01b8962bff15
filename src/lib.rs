//! Calculator and greeting agent
//!
//! An LLM-driven agent with two tools, a four-operation calculator and a
//! greeter, that streams progress while it works and classifies its final
//! answer as complete or needing more input.

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod session;
pub mod tools;

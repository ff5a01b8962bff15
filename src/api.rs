//! HTTP surface for the agent
//!
//! A thin JSON/SSE wrapper around [`Agent::run_turn`]: an agent card for
//! discovery, a blocking send endpoint and a streaming one.

mod card;
mod handlers;
mod sse;
mod types;

pub use card::{AgentCapabilities, AgentCard, AgentSkill};
pub use handlers::create_router;
pub use types::*;

use crate::agent::Agent;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub agent: Agent,
    pub card: Arc<AgentCard>,
}

impl AppState {
    pub fn new(agent: Agent, card: AgentCard) -> Self {
        Self {
            agent,
            card: Arc::new(card),
        }
    }
}

//! Pure state transitions for a single turn
//!
//! `Start -> AwaitingModel -> InvokingTool -> AwaitingModel -> ... -> Classifying`.
//! The driver in [`super::Agent::run_turn`] feeds events in and carries out
//! the returned effects; nothing in here performs I/O.

use super::progress::{
    ProgressEvent, PERFORMING_CALCULATION, PREPARING_GREETING, PROCESSING_RESULT,
};
use crate::session::{Message, ToolCall};
use crate::tools::{ToolOutput, CALCULATOR_TOOL, GREETING_TOOL};
use thiserror::Error;

pub const DEFAULT_MAX_STEPS: u32 = 25;

/// Bounds on a single turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnLimits {
    /// Maximum model requests per turn
    pub max_steps: u32,
}

impl Default for TurnLimits {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// Where a turn currently is. `step` counts model requests made so far.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TurnState {
    #[default]
    Start,
    AwaitingModel {
        step: u32,
    },
    InvokingTool {
        step: u32,
        call: ToolCall,
    },
    /// Final answer recorded, waiting for the completion policy
    Classifying,
    StepLimitReached {
        steps: u32,
    },
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnState::Classifying | TurnState::StepLimitReached { .. }
        )
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    UserUtterance {
        text: String,
    },
    ModelReplied {
        text: String,
        /// Every call the model asked for, in order
        tool_calls: Vec<ToolCall>,
    },
    ToolFinished {
        call_id: String,
        output: ToolOutput,
    },
}

/// Work for the driver, in the order it must happen
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append to the session history
    Append(Message),
    /// Yield an intermediate progress record
    Announce(ProgressEvent),
    /// Ask the model for its next message; `step` is the request number
    RequestModel { step: u32 },
    InvokeTool(ToolCall),
    /// Ask the completion policy for the terminal record
    Classify,
    /// Yield this terminal record without classification
    Finish(ProgressEvent),
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Tool result for {got} does not match pending call {expected}")]
    UnexpectedToolResult { expected: String, got: String },
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn step_limit_message(steps: u32) -> String {
    format!("I could not finish this request within {steps} steps. Please try again.")
}

/// Announcement for the tool the model just chose, by name; arguments that
/// fail to parse still get announced, unknown tools get nothing
fn announce(call: &ToolCall) -> Option<ProgressEvent> {
    match call.name() {
        CALCULATOR_TOOL => Some(ProgressEvent::working(PERFORMING_CALCULATION)),
        GREETING_TOOL => Some(ProgressEvent::working(PREPARING_GREETING)),
        _ => None,
    }
}

/// Pure transition function
pub fn transition(
    state: &TurnState,
    limits: TurnLimits,
    event: TurnEvent,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        (TurnState::Start, TurnEvent::UserUtterance { text }) => {
            Ok(TransitionResult::new(TurnState::AwaitingModel { step: 1 })
                .with_effect(Effect::Append(Message::user(text)))
                .with_effect(Effect::RequestModel { step: 1 }))
        }

        // No tool calls: candidate final answer
        (TurnState::AwaitingModel { .. }, TurnEvent::ModelReplied { text, tool_calls })
            if tool_calls.is_empty() =>
        {
            Ok(TransitionResult::new(TurnState::Classifying)
                .with_effect(Effect::Append(Message::agent(text, vec![])))
                .with_effect(Effect::Classify))
        }

        // Only the first call of a batch is honored; the rest are dropped
        // before they reach history so every recorded call gets a result.
        (TurnState::AwaitingModel { step }, TurnEvent::ModelReplied { text, mut tool_calls }) => {
            tool_calls.truncate(1);
            let call = tool_calls[0].clone();
            let mut result = TransitionResult::new(TurnState::InvokingTool {
                step: *step,
                call: call.clone(),
            })
            .with_effect(Effect::Append(Message::agent(text, tool_calls)));
            if let Some(progress) = announce(&call) {
                result = result.with_effect(Effect::Announce(progress));
            }
            Ok(result.with_effect(Effect::InvokeTool(call)))
        }

        (TurnState::InvokingTool { step, call }, TurnEvent::ToolFinished { call_id, output }) => {
            if call_id != call.id {
                return Err(TransitionError::UnexpectedToolResult {
                    expected: call.id.clone(),
                    got: call_id,
                });
            }

            let recorded = TransitionResult::new(TurnState::Classifying)
                .with_effect(Effect::Append(Message::tool_result(call, output.output)))
                .with_effect(Effect::Announce(ProgressEvent::working(PROCESSING_RESULT)));

            if *step >= limits.max_steps {
                let mut result = recorded.with_effect(Effect::Finish(
                    ProgressEvent::input_required(step_limit_message(*step)),
                ));
                result.new_state = TurnState::StepLimitReached { steps: *step };
                return Ok(result);
            }

            let mut result = recorded.with_effect(Effect::RequestModel { step: step + 1 });
            result.new_state = TurnState::AwaitingModel { step: step + 1 };
            Ok(result)
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{state:?} cannot handle {event:?}"
        ))),
    }
}

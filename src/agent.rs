//! The calculator and greeting agent
//!
//! [`Agent::run_turn`] drives one user utterance through the model/tool loop
//! and streams [`ProgressEvent`]s back. The decisions live in the pure
//! [`turn::transition`] function; this module only performs the effects.

mod classifier;
mod progress;
mod prompt;
mod recovery;
mod turn;

#[cfg(test)]
pub mod testing;

pub use classifier::{
    CompletionPolicy, PhraseClassifier, FALLBACK_CONTENT, INPUT_REQUIRED_PHRASES,
};
pub use progress::{
    ProgressEvent, TaskStatus, PERFORMING_CALCULATION, PREPARING_GREETING, PROCESSING_RESULT,
};
pub use prompt::SYSTEM_INSTRUCTION;
pub use recovery::{interrupted_tool_results, INTERRUPTED_TOOL_CONTENT};
pub use turn::{
    step_limit_message, transition, Effect, TransitionError, TransitionResult, TurnEvent,
    TurnLimits, TurnState, DEFAULT_MAX_STEPS,
};

use crate::config::AgentConfig;
use crate::llm::{LlmError, LlmRequest, LlmService, SystemContent};
use crate::session::{to_llm_messages, SessionStore, StoreError, ToolCall};
use crate::tools;
use std::time::Instant;
use async_stream::try_stream;
use futures::Stream;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Why a turn ended without a terminal record
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Message text must not be empty")]
    EmptyInput,
    #[error("Model backend failed: {0}")]
    Backend(#[from] LlmError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

#[derive(Clone)]
pub struct Agent {
    llm: Arc<dyn LlmService>,
    store: Arc<dyn SessionStore>,
    policy: Arc<dyn CompletionPolicy>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(llm: Arc<dyn LlmService>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            llm,
            store,
            policy: Arc::new(PhraseClassifier::default()),
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn CompletionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Run one turn for `user_text` in session `session_id`.
    ///
    /// Yields zero or more working records followed by exactly one terminal
    /// record. A failure ends the stream with a single `Err` instead of the
    /// terminal record. Turns on the same session run one at a time; a later
    /// call waits for the earlier turn's stream to finish or be dropped.
    pub fn run_turn(
        &self,
        session_id: impl Into<String>,
        user_text: impl Into<String>,
    ) -> impl Stream<Item = Result<ProgressEvent, AgentError>> + Send + 'static {
        let agent = self.clone();
        let session_id = session_id.into();
        let user_text = user_text.into();

        try_stream! {
            if user_text.is_empty() {
                Err::<(), AgentError>(AgentError::EmptyInput)?;
            }

            let _turn = agent.store.lock_turn(&session_id).await?;
            agent.recover(&session_id).await?;
            tracing::info!(session_id = %session_id, "Starting turn");

            let limits = TurnLimits {
                max_steps: agent.config.max_steps,
            };
            let mut state = TurnState::Start;
            let mut events = VecDeque::from([TurnEvent::UserUtterance { text: user_text }]);

            while let Some(event) = events.pop_front() {
                let result = transition(&state, limits, event)?;
                state = result.new_state;

                for effect in result.effects {
                    match effect {
                        Effect::Append(message) => {
                            agent.store.append(&session_id, message).await?;
                        }
                        Effect::Announce(progress) | Effect::Finish(progress) => {
                            yield progress;
                        }
                        Effect::RequestModel { step } => {
                            let reply = agent.request_model(&session_id, step).await?;
                            events.push_back(reply);
                        }
                        Effect::InvokeTool(call) => {
                            events.push_back(invoke_tool(&session_id, call));
                        }
                        Effect::Classify => {
                            let record = agent.classify(&session_id).await?;
                            yield record;
                        }
                    }
                }
            }

            if let TurnState::StepLimitReached { steps } = state {
                tracing::warn!(session_id = %session_id, steps, "Turn stopped at step limit");
            }
            tracing::info!(session_id = %session_id, "Turn finished");
        }
    }

    /// Close out tool calls a dropped turn left without results
    async fn recover(&self, session_id: &str) -> Result<(), AgentError> {
        let history = self.store.history(session_id).await?;
        let repairs = interrupted_tool_results(&history);
        if repairs.is_empty() {
            return Ok(());
        }

        tracing::warn!(
            session_id = %session_id,
            count = repairs.len(),
            "Recovering tool calls from an interrupted turn"
        );
        for message in repairs {
            self.store.append(session_id, message).await?;
        }
        Ok(())
    }

    async fn request_model(&self, session_id: &str, step: u32) -> Result<TurnEvent, AgentError> {
        let history = self.store.history(session_id).await?;
        let request = LlmRequest {
            system: vec![SystemContent::new(SYSTEM_INSTRUCTION)],
            messages: to_llm_messages(&history),
            tools: tools::definitions(),
            max_tokens: self.config.max_tokens,
        };

        let start = Instant::now();
        let response = match self.llm.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    session_id = %session_id,
                    step,
                    model = %self.llm.model_id(),
                    duration_ms = %start.elapsed().as_millis(),
                    error = %e,
                    retryable = e.kind.is_retryable(),
                    "Model request failed"
                );
                return Err(e.into());
            }
        };

        let tool_calls: Vec<ToolCall> = response
            .tool_uses()
            .into_iter()
            .map(|(id, name, input)| ToolCall::new(id, name, input.clone()))
            .collect();

        tracing::info!(
            session_id = %session_id,
            step,
            model = %self.llm.model_id(),
            duration_ms = %start.elapsed().as_millis(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            tool_calls = tool_calls.len(),
            "Model replied"
        );

        if let [first, rest @ ..] = tool_calls.as_slice() {
            if !rest.is_empty() {
                tracing::warn!(
                    session_id = %session_id,
                    kept = %first.name(),
                    discarded = rest.len(),
                    "Model requested several tools; only the first is executed"
                );
            }
        }

        Ok(TurnEvent::ModelReplied {
            text: response.text(),
            tool_calls,
        })
    }

    /// Terminal record for the session's current history
    pub async fn classify(&self, session_id: &str) -> Result<ProgressEvent, AgentError> {
        let history = self.store.history(session_id).await?;
        Ok(self.policy.classify(history.last()))
    }
}

fn invoke_tool(session_id: &str, call: ToolCall) -> TurnEvent {
    tracing::info!(
        session_id = %session_id,
        tool = %call.name(),
        id = %call.id,
        "Executing tool"
    );
    let output = tools::execute(&call.input);
    if !output.success {
        tracing::debug!(tool = %call.name(), output = %output.output, "Tool reported an error");
    }
    TurnEvent::ToolFinished {
        call_id: call.id,
        output,
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FailingStore, MockLlmClient};
    use super::*;
    use crate::llm::{ContentBlock, MessageRole};
    use crate::session::{InMemorySessionStore, Message};
    use futures::StreamExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn setup() -> (Arc<MockLlmClient>, Agent) {
        let llm = Arc::new(MockLlmClient::new("mock-model"));
        let agent = Agent::new(llm.clone(), Arc::new(InMemorySessionStore::new()));
        (llm, agent)
    }

    async fn collect(
        stream: impl Stream<Item = Result<ProgressEvent, AgentError>>,
    ) -> Vec<Result<ProgressEvent, AgentError>> {
        stream.collect().await
    }

    async fn run_ok(agent: &Agent, session_id: &str, text: &str) -> Vec<ProgressEvent> {
        collect(agent.run_turn(session_id, text))
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect()
    }

    fn tool_result_contents(request: &LlmRequest) -> Vec<String> {
        request
            .messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|block| match block {
                ContentBlock::ToolResult { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    async fn wait_for_requests(llm: &MockLlmClient, count: usize) {
        for _ in 0..200 {
            if llm.recorded_requests().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("never saw {count} requests");
    }

    #[tokio::test]
    async fn test_calculation_turn() {
        let (llm, agent) = setup();
        llm.queue_tool_calls(&[(
            "call-1",
            "calculator",
            json!({"operation": "add", "a": 25, "b": 17}),
        )]);
        llm.queue_text("25 plus 17 is 42.");

        let records = run_ok(&agent, "ctx-1", "What is 25 plus 17?").await;
        assert_eq!(
            records,
            vec![
                ProgressEvent::working(PERFORMING_CALCULATION),
                ProgressEvent::working(PROCESSING_RESULT),
                ProgressEvent::completed("25 plus 17 is 42."),
            ]
        );

        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].system[0].text, SYSTEM_INSTRUCTION);
        assert_eq!(requests[0].tools.len(), 2);
        assert_eq!(tool_result_contents(&requests[1]), vec!["42.0".to_string()]);

        let history = agent.store().history("ctx-1").await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], Message::user("What is 25 plus 17?"));
    }

    #[tokio::test]
    async fn test_greeting_turn() {
        let (llm, agent) = setup();
        llm.queue_tool_calls(&[("call-1", "get_greeting", json!({"name": "Alice"}))]);
        llm.queue_text("Hello Alice! Nice to meet you! 👋");

        let records = run_ok(&agent, "ctx-1", "Say hello to Alice").await;
        assert_eq!(records[0], ProgressEvent::working(PREPARING_GREETING));
        assert_eq!(records[1], ProgressEvent::working(PROCESSING_RESULT));
        assert!(records[2].is_task_complete);
        assert_eq!(
            tool_result_contents(&llm.recorded_requests()[1]),
            vec!["Hello Alice! Nice to meet you! 👋".to_string()]
        );
    }

    #[tokio::test]
    async fn test_direct_answer_without_tools() {
        let (llm, agent) = setup();
        llm.queue_text("I can only help with greetings and basic arithmetic operations.");

        let records = run_ok(&agent, "ctx-1", "What's the weather?").await;
        assert_eq!(records.len(), 1);
        assert!(records[0].is_task_complete);
    }

    #[tokio::test]
    async fn test_division_by_zero_is_reported_to_model() {
        let (llm, agent) = setup();
        llm.queue_tool_calls(&[(
            "call-1",
            "calculator",
            json!({"operation": "divide", "a": 1, "b": 0}),
        )]);
        llm.queue_text("You cannot divide by zero.");

        let records = run_ok(&agent, "ctx-1", "What is 1 divided by 0?").await;
        assert_eq!(
            records.last(),
            Some(&ProgressEvent::completed("You cannot divide by zero."))
        );
        assert_eq!(
            tool_result_contents(&llm.recorded_requests()[1]),
            vec!["Error: Division by zero".to_string()]
        );
    }

    #[tokio::test]
    async fn test_follow_up_sees_prior_turn() {
        let (llm, agent) = setup();
        llm.queue_tool_calls(&[(
            "call-1",
            "calculator",
            json!({"operation": "add", "a": 25, "b": 17}),
        )]);
        llm.queue_text("25 plus 17 is 42.");
        llm.queue_text("Which number should I multiply by?");

        run_ok(&agent, "ctx-1", "What is 25 plus 17?").await;
        let records = run_ok(&agent, "ctx-1", "Now multiply it").await;

        assert_eq!(
            records,
            vec![ProgressEvent::input_required(
                "Which number should I multiply by?"
            )]
        );
        let requests = llm.recorded_requests();
        assert_eq!(requests[2].messages.len(), 5);
        assert_eq!(requests[2].messages[4].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let (llm, agent) = setup();
        llm.queue_text("Hi!");
        llm.queue_text("Hello again!");

        run_ok(&agent, "ctx-a", "hello").await;
        run_ok(&agent, "ctx-b", "hello").await;

        assert_eq!(llm.recorded_requests()[1].messages.len(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_ends_stream_with_error() {
        let (llm, agent) = setup();
        llm.queue_error(LlmError::server_error("upstream exploded"));

        let items = collect(agent.run_turn("ctx-1", "What is 2 plus 2?")).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(AgentError::Backend(_))));
    }

    #[tokio::test]
    async fn test_only_first_tool_call_runs() {
        let (llm, agent) = setup();
        llm.queue_tool_calls(&[
            ("call-1", "calculator", json!({"operation": "multiply", "a": 6, "b": 7})),
            ("call-2", "get_greeting", json!({"name": "Bob"})),
        ]);
        llm.queue_text("6 times 7 is 42.");

        let records = run_ok(&agent, "ctx-1", "6 times 7, and greet Bob").await;
        assert!(!records.contains(&ProgressEvent::working(PREPARING_GREETING)));

        let history = agent.store().history("ctx-1").await.unwrap();
        match &history[1] {
            Message::Agent { tool_calls, .. } => {
                assert_eq!(tool_calls.len(), 1);
                assert_eq!(tool_calls[0].id, "call-1");
            }
            other => panic!("expected agent message, got {other:?}"),
        }
        assert_eq!(
            tool_result_contents(&llm.recorded_requests()[1]),
            vec!["42.0".to_string()]
        );
    }

    #[tokio::test]
    async fn test_calculator_with_missing_argument_is_announced() {
        let (llm, agent) = setup();
        llm.queue_tool_calls(&[("call-1", "calculator", json!({"operation": "add", "a": 25}))]);
        llm.queue_text("I need both numbers.");

        let records = run_ok(&agent, "ctx-1", "Add 25").await;
        assert_eq!(records[0], ProgressEvent::working(PERFORMING_CALCULATION));
        assert_eq!(records[1], ProgressEvent::working(PROCESSING_RESULT));
        assert_eq!(
            tool_result_contents(&llm.recorded_requests()[1]),
            vec!["Error: Invalid arguments for calculator".to_string()]
        );
    }

    #[tokio::test]
    async fn test_tool_arguments_replay_verbatim() {
        let (llm, agent) = setup();
        let modulo = json!({"operation": "modulo", "a": 7, "b": 3});
        llm.queue_tool_calls(&[("call-1", "calculator", modulo.clone())]);
        llm.queue_text("I can only add, subtract, multiply and divide.");

        run_ok(&agent, "ctx-1", "7 mod 3?").await;

        let replayed: Vec<Value> = llm.recorded_requests()[1]
            .messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|block| match block {
                ContentBlock::ToolUse { input, .. } => Some(input.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(replayed, vec![modulo]);
        assert_eq!(
            tool_result_contents(&llm.recorded_requests()[1]),
            vec!["Error: Unknown operation".to_string()]
        );
    }

    #[tokio::test]
    async fn test_whitespace_input_reaches_model() {
        let (llm, agent) = setup();
        llm.queue_text("Could you clarify what you need?");

        let records = run_ok(&agent, "ctx-1", "   ").await;
        assert_eq!(
            records,
            vec![ProgressEvent::input_required("Could you clarify what you need?")]
        );
        assert_eq!(llm.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_announced() {
        let (llm, agent) = setup();
        llm.queue_tool_calls(&[("call-1", "weather", json!({"city": "Oslo"}))]);
        llm.queue_text("I can only help with greetings and basic arithmetic operations.");

        let records = run_ok(&agent, "ctx-1", "Weather in Oslo?").await;
        assert_eq!(records[0], ProgressEvent::working(PROCESSING_RESULT));
        assert_eq!(records.len(), 2);
        assert_eq!(
            tool_result_contents(&llm.recorded_requests()[1]),
            vec!["Error: Unknown tool weather".to_string()]
        );
    }

    #[tokio::test]
    async fn test_step_limit() {
        let llm = Arc::new(MockLlmClient::new("mock-model"));
        let agent = Agent::new(llm.clone(), Arc::new(InMemorySessionStore::new())).with_config(
            AgentConfig {
                max_steps: 2,
                max_tokens: None,
            },
        );
        let add = json!({"operation": "add", "a": 1, "b": 1});
        llm.queue_tool_calls(&[("call-1", "calculator", add.clone())]);
        llm.queue_tool_calls(&[("call-2", "calculator", add)]);
        llm.queue_text("never reached");

        let records = run_ok(&agent, "ctx-1", "keep adding").await;
        assert_eq!(records.len(), 5);
        assert_eq!(
            records.last(),
            Some(&ProgressEvent::input_required(step_limit_message(2)))
        );
        assert_eq!(llm.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let (llm, agent) = setup();
        let items = collect(agent.run_turn("ctx-1", "")).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(AgentError::EmptyInput)));
        assert!(llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_custom_completion_policy() {
        struct AlwaysDone;
        impl CompletionPolicy for AlwaysDone {
            fn classify(&self, _last: Option<&Message>) -> ProgressEvent {
                ProgressEvent::completed("done")
            }
        }

        let (llm, agent) = setup();
        let agent = agent.with_policy(Arc::new(AlwaysDone));
        llm.queue_text("Which one?");

        let records = run_ok(&agent, "ctx-1", "hi").await;
        assert_eq!(records, vec![ProgressEvent::completed("done")]);
    }

    #[tokio::test]
    async fn test_dropped_turn_is_recovered() {
        let (llm, agent) = setup();
        llm.queue_tool_calls(&[(
            "call-1",
            "calculator",
            json!({"operation": "add", "a": 2, "b": 2}),
        )]);
        llm.queue_text("Hello!");

        {
            let mut stream = Box::pin(agent.run_turn("ctx-1", "What is 2 plus 2?"));
            let first = stream.next().await.unwrap().unwrap();
            assert_eq!(first, ProgressEvent::working(PERFORMING_CALCULATION));
        }

        let records = tokio::time::timeout(Duration::from_secs(1), run_ok(&agent, "ctx-1", "hi"))
            .await
            .expect("lock released when the stream was dropped");
        assert_eq!(records, vec![ProgressEvent::completed("Hello!")]);

        let history = agent.store().history("ctx-1").await.unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(
            tool_result_contents(&llm.recorded_requests()[1]),
            vec![INTERRUPTED_TOOL_CONTENT.to_string()]
        );
    }

    #[tokio::test]
    async fn test_same_session_turns_run_one_at_a_time() {
        let gate = Arc::new(Notify::new());
        let llm = Arc::new(MockLlmClient::new("mock-model").gated(gate.clone()));
        llm.queue_text("first answer");
        llm.queue_text("second answer");
        let agent = Agent::new(llm.clone(), Arc::new(InMemorySessionStore::new()));

        let first = tokio::spawn(collect(agent.run_turn("ctx-1", "one")));
        wait_for_requests(&llm, 1).await;
        let second = tokio::spawn(collect(agent.run_turn("ctx-1", "two")));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(llm.recorded_requests().len(), 1);

        gate.notify_one();
        let first = first.await.unwrap();
        assert!(first[0].as_ref().unwrap().is_task_complete);

        wait_for_requests(&llm, 2).await;
        gate.notify_one();
        second.await.unwrap();

        // user, agent, then the second user message
        assert_eq!(llm.recorded_requests()[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let llm = Arc::new(MockLlmClient::new("mock-model"));
        let agent = Agent::new(llm, Arc::new(FailingStore));

        let items = collect(agent.run_turn("ctx-1", "hello")).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(AgentError::Store(_))));
    }
}

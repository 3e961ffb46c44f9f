//! Tool-calling agent loop.
//!
//! An agent sends the conversation plus its tool specs to the model, runs
//! every tool the model asks for, feeds the results back, and repeats until
//! the model answers in plain text. Tool failures are reported to the model
//! as tool results; only backend failures and runaway loops are errors.

use crate::backend::{LlmBackend, LlmMessage, LlmRequest, ToolCall, ToolSpec};
use crate::error::AgentError;
use async_trait::async_trait;
use rootcause::prelude::{Report, ResultExt};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Default iteration budget for one agent turn.
pub const DEFAULT_MAX_ITERATIONS: u32 = 8;

/// Executes tool calls on behalf of an agent.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Specs for every tool the model may call.
    fn specs(&self) -> Vec<ToolSpec>;

    /// Runs one call and returns the tool-result message for it.
    ///
    /// Implementations must not fail: errors are rendered into the result
    /// content so the model can react to them.
    async fn execute(&self, call: &ToolCall) -> LlmMessage;
}

/// What one agent turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutcome {
    /// New messages in order: tool-call turns, tool results, final answer.
    pub messages: Vec<LlmMessage>,
    /// Number of model calls made.
    pub iterations: u32,
}

impl AgentOutcome {
    /// The final plain-text answer.
    #[must_use]
    pub fn final_answer(&self) -> &str {
        self.messages.last().map_or("", |m| m.content.as_str())
    }
}

/// A named specialist that answers with the help of tools.
#[derive(Clone)]
pub struct Agent {
    name: String,
    system_prompt: String,
    tools: Arc<dyn ToolExecutor>,
    max_iterations: u32,
    temperature: Option<f32>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("tools", &self.tools.specs().len())
            .field("max_iterations", &self.max_iterations)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Creates an agent with the default iteration budget.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        tools: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            temperature: None,
        }
    }

    /// Sets the maximum number of model calls per turn.
    #[must_use]
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// The agent's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn request(&self, history: &[LlmMessage], produced: &[LlmMessage]) -> LlmRequest {
        let mut messages = Vec::with_capacity(history.len() + produced.len() + 1);
        messages.push(LlmMessage::system(self.system_prompt.clone()));
        messages.extend(history.iter().cloned());
        messages.extend(produced.iter().cloned());

        let mut request = LlmRequest::new(messages).with_tools(self.tools.specs());
        request.temperature = self.temperature;
        request
    }

    /// Runs one turn over `history`.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::BackendFailed` if a model call fails, or
    /// `AgentError::MaxIterationsExceeded` if the model is still calling
    /// tools when the budget runs out.
    #[instrument(skip(self, backend, history), fields(agent = %self.name))]
    pub async fn run(
        &self,
        backend: &dyn LlmBackend,
        history: &[LlmMessage],
    ) -> Result<AgentOutcome, Report<AgentError>> {
        let mut produced = Vec::new();

        for iteration in 1..=self.max_iterations {
            let request = self.request(history, &produced);
            let response = backend.generate(&request).await.context(
                AgentError::BackendFailed {
                    agent: self.name.clone(),
                    iteration,
                },
            )?;

            if response.tool_calls.is_empty() {
                produced.push(LlmMessage::assistant(response.content));
                info!(iterations = iteration, "agent answered");
                return Ok(AgentOutcome {
                    messages: produced,
                    iterations: iteration,
                });
            }

            let calls = response.tool_calls;
            produced.push(LlmMessage::assistant_tool_calls(
                response.content,
                calls.clone(),
            ));
            for call in &calls {
                debug!(tool = %call.name, iteration, "running tool");
                produced.push(self.tools.execute(call).await);
            }
        }

        Err(AgentError::MaxIterationsExceeded {
            agent: self.name.clone(),
            max: self.max_iterations,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LlmResponse, MessageRole};
    use crate::scripted::ScriptedBackend;

    struct PriceTools;

    #[async_trait]
    impl ToolExecutor for PriceTools {
        fn specs(&self) -> Vec<ToolSpec> {
            vec![ToolSpec::new("get_price_details", "Price of a product")]
        }

        async fn execute(&self, call: &ToolCall) -> LlmMessage {
            match call.name.as_str() {
                "get_price_details" => LlmMessage::tool(&call.id, "The sofa costs $1,500."),
                other => LlmMessage::tool(&call.id, format!("Error: unknown tool '{other}'")),
            }
        }
    }

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: serde_json::json!({}),
        }
    }

    fn agent() -> Agent {
        Agent::new("PricingAgent", "You answer pricing questions.", Arc::new(PriceTools))
    }

    #[tokio::test]
    async fn runs_tools_then_answers() {
        let backend = ScriptedBackend::new()
            .with_response(LlmResponse::tool_calls(vec![call("c1", "get_price_details")]))
            .with_response(LlmResponse::text("The Grand Comfort Sofa is $1,500."));

        let outcome = agent()
            .run(&backend, &[LlmMessage::user("How much is the sofa?")])
            .await
            .expect("agent run");

        assert_eq!(outcome.iterations, 2);
        let roles: Vec<_> = outcome.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::Assistant, MessageRole::Tool, MessageRole::Assistant]
        );
        assert_eq!(outcome.final_answer(), "The Grand Comfort Sofa is $1,500.");

        let second = &backend.requests()[1];
        assert_eq!(second.tools.len(), 1);
        assert_eq!(
            second.messages.last().and_then(|m| m.tool_call_id.as_deref()),
            Some("c1")
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_the_model() {
        let backend = ScriptedBackend::new()
            .with_response(LlmResponse::tool_calls(vec![call("c1", "launch_rocket")]))
            .with_response(LlmResponse::text("Sorry, I cannot do that."));

        let outcome = agent()
            .run(&backend, &[LlmMessage::user("launch")])
            .await
            .expect("agent run");
        assert!(outcome.messages[1].content.contains("unknown tool"));
    }

    #[tokio::test]
    async fn endless_tool_calls_hit_the_budget() {
        let backend = ScriptedBackend::new()
            .with_response(LlmResponse::tool_calls(vec![call("c1", "get_price_details")]))
            .with_response(LlmResponse::tool_calls(vec![call("c2", "get_price_details")]));

        let err = agent()
            .with_max_iterations(2)
            .run(&backend, &[LlmMessage::user("price?")])
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            AgentError::MaxIterationsExceeded { max: 2, .. }
        ));
    }
}

//! Tools available to conversational agents.
//!
//! A tool is a named operation with a JSON-schema argument object and a text
//! result. The registry dispatches model-requested calls and always produces
//! a tool-result message: unknown tools, bad arguments and execution failures
//! are reported back to the model as text.

use crate::error::ToolError;
use crate::message::Message;
use async_trait::async_trait;
use rootcause::prelude::Report;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use switchboard_ai::{LlmMessage, ToolCall, ToolExecutor, ToolSpec};
use tracing::{instrument, warn};

/// Trait for tool execution.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool spec shown to the model.
    fn definition(&self) -> ToolSpec;

    /// Executes the tool with the given arguments.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::InvalidInput` for unusable arguments or
    /// `ToolError::ExecutionFailed` when the operation itself fails.
    async fn execute(&self, input: JsonValue) -> Result<String, Report<ToolError>>;
}

/// Decodes tool arguments into `T`.
///
/// # Errors
///
/// Returns `ToolError::InvalidInput` naming the tool.
pub fn parse_args<T: DeserializeOwned>(
    tool: &str,
    input: JsonValue,
) -> Result<T, Report<ToolError>> {
    serde_json::from_value(input).map_err(|e| {
        ToolError::InvalidInput {
            name: tool.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

type ToolFn = dyn Fn(JsonValue) -> Result<String, ToolError> + Send + Sync;

/// A tool backed by a synchronous closure.
pub struct FnTool {
    spec: ToolSpec,
    func: Box<ToolFn>,
}

impl FnTool {
    /// Wraps `func` under `spec`.
    pub fn new<F>(spec: ToolSpec, func: F) -> Self
    where
        F: Fn(JsonValue) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        Self {
            spec,
            func: Box::new(func),
        }
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.spec.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FnTool {
    fn definition(&self) -> ToolSpec {
        self.spec.clone()
    }

    async fn execute(&self, input: JsonValue) -> Result<String, Report<ToolError>> {
        (self.func)(input).map_err(Report::from)
    }
}

/// Registry of available tools, in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|t| t.definition().name))
            .finish()
    }
}

impl ToolRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        self.tools.retain(|t| t.definition().name != name);
        self.tools.push(tool);
    }

    /// Builder form of [`ToolRegistry::register`].
    #[must_use]
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(Arc::new(tool));
        self
    }

    /// Gets a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|t| t.definition().name == name)
            .cloned()
    }

    /// Returns every tool spec in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Runs one model-requested call and wraps the outcome as a tool message.
    #[instrument(skip(self, call), fields(tool = %call.name))]
    pub async fn dispatch(&self, call: &ToolCall) -> Message {
        let outcome = match self.get(&call.name) {
            Some(tool) => tool.execute(call.arguments.clone()).await,
            None => Err(ToolError::NotFound {
                name: call.name.clone(),
            }
            .into()),
        };

        let content = match outcome {
            Ok(text) => text,
            Err(report) => {
                warn!(error = %report, "tool call failed");
                format!("Error: {}", report.current_context())
            }
        };
        Message::tool(&call.id, &call.name, content)
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    fn specs(&self) -> Vec<ToolSpec> {
        self.definitions()
    }

    async fn execute(&self, call: &ToolCall) -> LlmMessage {
        self.dispatch(call).await.to_llm()
    }
}

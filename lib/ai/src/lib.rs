//! AI primitives for switchboard.
//!
//! - **LLM Call**: single-shot inference with optional structured output
//! - **Classifier**: forced choice from a closed label set
//! - **Agent**: a tool-calling loop around one specialist prompt
//!
//! Backends implement [`LlmBackend`] and [`EmbeddingBackend`]. The
//! [`OpenAiBackend`] talks to any OpenAI-compatible endpoint; the
//! [`ScriptedBackend`] replays canned responses.

pub mod agent;
pub mod backend;
pub mod classify;
pub mod error;
pub mod llm_call;
pub mod openai;
pub mod prompt;
pub mod scripted;

pub use agent::{Agent, AgentOutcome, ToolExecutor};
pub use backend::{
    EmbeddingBackend, LlmBackend, LlmMessage, LlmProvider, LlmRequest, LlmResponse, MessageRole,
    OutputSchema, TokenUsage, ToolCall, ToolSpec,
};
pub use classify::Classifier;
pub use error::{AgentError, AiError, LlmError, PromptError};
pub use llm_call::{LlmCall, LlmCallResult, parse_json_content, strip_code_fence};
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use prompt::{PromptTemplate, VariableDefinition};
pub use scripted::{ScriptedBackend, ScriptedEmbedder};

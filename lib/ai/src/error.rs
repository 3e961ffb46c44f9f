//! Error types for the AI crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `LlmError`: transport and provider failures
//! - `PromptError`: prompt template rendering
//! - `AgentError`: the tool-calling loop
//! - `AiError`: structured-output and classification failures

use switchboard_core::InvocationId;
use std::fmt;

/// Errors from LLM backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The provider could not be reached.
    ProviderUnavailable { provider: String, reason: String },
    /// The provider answered with a non-success status.
    RequestFailed { status: Option<u16>, reason: String },
    /// The response body could not be decoded.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for response.
    Timeout,
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// Invalid configuration.
    InvalidConfig { reason: String },
    /// A scripted backend ran out of queued responses.
    ScriptExhausted,
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable { provider, reason } => {
                write!(f, "LLM provider '{provider}' unavailable: {reason}")
            }
            Self::RequestFailed {
                status: Some(status),
                reason,
            } => write!(f, "LLM request failed with status {status}: {reason}"),
            Self::RequestFailed {
                status: None,
                reason,
            } => write!(f, "LLM request failed: {reason}"),
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid LLM configuration: {reason}")
            }
            Self::ScriptExhausted => write!(f, "scripted backend has no responses left"),
        }
    }
}

impl std::error::Error for LlmError {}

/// Errors from prompt operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// Missing required variables.
    MissingVariables {
        template: String,
        variables: Vec<String>,
    },
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVariables {
                template,
                variables,
            } => {
                write!(
                    f,
                    "missing required variables [{}] in template '{template}'",
                    variables.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for PromptError {}

/// Errors from the tool-calling agent loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The model kept requesting tools past the iteration budget.
    MaxIterationsExceeded { agent: String, max: u32 },
    /// The backend call for one iteration failed.
    BackendFailed { agent: String, iteration: u32 },
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxIterationsExceeded { agent, max } => {
                write!(f, "agent '{agent}' exceeded {max} iterations")
            }
            Self::BackendFailed { agent, iteration } => {
                write!(f, "agent '{agent}' backend call failed on iteration {iteration}")
            }
        }
    }
}

impl std::error::Error for AgentError {}

/// High-level AI operation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    /// LLM call context (use as context wrapper).
    LlmCall { invocation_id: InvocationId },
    /// Output did not match the requested schema.
    SchemaValidationFailed { expected: String, actual: String },
    /// A forced-choice answer was not one of the allowed labels.
    LabelOutOfSet { label: String, allowed: Vec<String> },
}

impl fmt::Display for AiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LlmCall { invocation_id } => {
                write!(f, "LLM call {invocation_id} failed")
            }
            Self::SchemaValidationFailed { expected, actual } => {
                write!(
                    f,
                    "output schema validation failed: expected {expected}, got {actual}"
                )
            }
            Self::LabelOutOfSet { label, allowed } => {
                write!(
                    f,
                    "label '{label}' is not one of [{}]",
                    allowed.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for AiError {}

//! LLM Call primitive.
//!
//! The fundamental AI operation: single-shot inference with optional
//! structured output. Classification, summarization, extraction and
//! translation are all built on this primitive.

use crate::backend::{LlmBackend, LlmMessage, LlmRequest, OutputSchema, TokenUsage};
use crate::error::AiError;
use chrono::{DateTime, Utc};
use rootcause::prelude::{Report, ResultExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Instant;
use switchboard_core::InvocationId;
use tracing::{debug, instrument};

/// The result of an LLM Call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCallResult {
    /// Unique identifier for this invocation.
    pub id: InvocationId,
    /// The raw text output.
    pub content: String,
    /// Structured output (if schema was provided).
    pub structured_output: Option<JsonValue>,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
    /// When the call was made.
    pub timestamp: DateTime<Utc>,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// An LLM Call builder.
#[derive(Debug, Clone, Default)]
pub struct LlmCall {
    prompt: Option<String>,
    system_prompt: Option<String>,
    history: Vec<LlmMessage>,
    images: Vec<String>,
    output_schema: Option<OutputSchema>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl LlmCall {
    /// Creates a call whose final user turn is `prompt`.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }

    /// Creates a call that sends an existing conversation as-is.
    #[must_use]
    pub fn from_history(history: Vec<LlmMessage>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    /// Adds a system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    /// Sets the prior conversation sent before the prompt.
    #[must_use]
    pub fn with_history(mut self, history: Vec<LlmMessage>) -> Self {
        self.history = history;
        self
    }

    /// Attaches an image (data URL) to the prompt turn.
    #[must_use]
    pub fn with_image(mut self, data_url: impl Into<String>) -> Self {
        self.images.push(data_url.into());
        self
    }

    /// Adds an output schema for structured output.
    #[must_use]
    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Builds an LLM request from this configuration.
    #[must_use]
    pub fn build_request(&self) -> LlmRequest {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(system) = &self.system_prompt {
            messages.push(LlmMessage::system(system.clone()));
        }
        messages.extend(self.history.iter().cloned());
        if let Some(prompt) = &self.prompt {
            let mut turn = LlmMessage::user(prompt.clone());
            turn.images = self.images.clone();
            messages.push(turn);
        }

        LlmRequest {
            messages,
            output_schema: self.output_schema.clone(),
            tools: Vec::new(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Sends the call to `backend`.
    ///
    /// # Errors
    ///
    /// Returns the backend error wrapped with the invocation id.
    #[instrument(skip_all, fields(model = backend.model()))]
    pub async fn run(&self, backend: &dyn LlmBackend) -> Result<LlmCallResult, Report<AiError>> {
        let id = InvocationId::new();
        let request = self.build_request();
        let started = Instant::now();

        let response = backend
            .generate(&request)
            .await
            .context(AiError::LlmCall { invocation_id: id })?;

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(invocation_id = %id, latency_ms, "LLM call completed");

        Ok(LlmCallResult {
            id,
            content: response.content,
            structured_output: response.structured_output,
            usage: response.usage,
            model: response.model,
            timestamp: Utc::now(),
            latency_ms,
        })
    }

    /// Sends the call and decodes the structured output into `T`.
    ///
    /// Falls back to parsing the text content when the provider did not
    /// return a separate structured payload.
    ///
    /// # Errors
    ///
    /// Returns `AiError::SchemaValidationFailed` if the output cannot be
    /// decoded as `T`.
    pub async fn run_structured<T: DeserializeOwned>(
        &self,
        backend: &dyn LlmBackend,
    ) -> Result<T, Report<AiError>> {
        let result = self.run(backend).await?;
        let value = match result.structured_output {
            Some(value) => value,
            None => parse_json_content(&result.content)?,
        };
        serde_json::from_value(value.clone()).map_err(|e| {
            AiError::SchemaValidationFailed {
                expected: format!("{} ({e})", std::any::type_name::<T>()),
                actual: value.to_string(),
            }
            .into()
        })
    }
}

/// Parses model text as JSON, tolerating a surrounding Markdown code fence.
///
/// # Errors
///
/// Returns `AiError::SchemaValidationFailed` if no JSON value can be read.
pub fn parse_json_content(content: &str) -> Result<JsonValue, Report<AiError>> {
    let unfenced = strip_code_fence(content);
    serde_json::from_str(unfenced).map_err(|_| {
        AiError::SchemaValidationFailed {
            expected: "JSON".to_string(),
            actual: content.to_string(),
        }
        .into()
    })
}

/// Removes a leading "```lang" line and trailing "```" if present.
#[must_use]
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

//! OpenAI-compatible HTTP backend.
//!
//! Speaks the `chat/completions` and `embeddings` endpoints. Structured output
//! uses `response_format: json_schema`; tools use the `function` tool type.

use crate::backend::{
    EmbeddingBackend, LlmBackend, LlmMessage, LlmProvider, LlmRequest, LlmResponse, MessageRole,
    TokenUsage, ToolCall,
};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Connection settings for an OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL without the `/v1` suffix.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Chat completion model.
    pub chat_model: String,
    /// Embedding model.
    pub embedding_model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Creates a configuration against the public endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Points the backend at a compatible provider.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the chat model.
    #[must_use]
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI-compatible chat and embedding backend.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    chat_model: String,
    embedding_model: String,
    provider: LlmProvider,
}

impl OpenAiBackend {
    /// Builds the HTTP client with bearer auth.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidConfig` if the key is empty or not a valid
    /// header value, or the client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, Report<LlmError>> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "API key is empty".to_string(),
            }
            .into());
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key)).map_err(|e| {
            LlmError::InvalidConfig {
                reason: format!("API key is not a valid header value: {e}"),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let provider = if base_url == DEFAULT_BASE_URL {
            LlmProvider::OpenAi
        } else {
            LlmProvider::OpenAiCompatible
        };

        Ok(Self {
            client,
            base_url,
            chat_model: config.chat_model,
            embedding_model: config.embedding_model,
            provider,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.base_url)
    }

    async fn post<B: Serialize + ?Sized, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, Report<LlmError>> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            warn!(?retry_after_secs, "provider rate limited the request");
            return Err(LlmError::RateLimited { retry_after_secs }.into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                status: Some(status.as_u16()),
                reason: body,
            }
            .into());
        }

        response
            .json::<R>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::ResponseParseFailed {
                        reason: e.to_string(),
                    }
                }
            })
            .map_err(Report::from)
    }
}

fn transport_error(error: &reqwest::Error) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout
    } else if error.is_connect() {
        LlmError::ProviderUnavailable {
            provider: "openai".to_string(),
            reason: error.to_string(),
        }
    } else {
        LlmError::RequestFailed {
            status: None,
            reason: error.to_string(),
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    #[instrument(skip(self, request), fields(model = %self.chat_model, messages = request.messages.len()))]
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, Report<LlmError>> {
        let body = ChatRequest::from_request(&self.chat_model, request);
        let response: ChatResponse = self.post("chat/completions", &body).await?;
        let response = response.into_llm_response(request.output_schema.is_some())?;
        debug!(
            tokens = response.usage.total(),
            tool_calls = response.tool_calls.len(),
            "chat completion finished"
        );
        Ok(response)
    }

    fn provider(&self) -> LlmProvider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.chat_model
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiBackend {
    #[instrument(skip(self, inputs), fields(model = %self.embedding_model, inputs = inputs.len()))]
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, Report<LlmError>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: inputs,
        };
        let response: EmbeddingResponse = self.post("embeddings", &body).await?;
        let mut data = response.data;
        if data.len() != inputs.len() {
            return Err(LlmError::ResponseParseFailed {
                reason: format!(
                    "expected {} embeddings, provider returned {}",
                    inputs.len(),
                    data.len()
                ),
            }
            .into());
        }
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

// Wire types for the chat completion API.

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<JsonValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<JsonValue>,
}

impl<'a> ChatRequest<'a> {
    fn from_request(model: &'a str, request: &'a LlmRequest) -> Self {
        let response_format = request.output_schema.as_ref().map(|schema| {
            serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": schema.strict,
                }
            })
        });
        let tools = request
            .tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect();

        Self {
            model,
            messages: request.messages.iter().map(WireMessage::from_message).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format,
            tools,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: Option<JsonValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> WireMessage<'a> {
    fn from_message(message: &'a LlmMessage) -> Self {
        let content = if !message.images.is_empty() {
            let mut parts = vec![serde_json::json!({"type": "text", "text": message.content})];
            parts.extend(message.images.iter().map(|url| {
                serde_json::json!({"type": "image_url", "image_url": {"url": url}})
            }));
            Some(JsonValue::Array(parts))
        } else if message.content.is_empty() && !message.tool_calls.is_empty() {
            None
        } else {
            Some(JsonValue::String(message.content.clone()))
        };

        let tool_calls = message
            .tool_calls
            .iter()
            .map(|call| {
                serde_json::json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.arguments.to_string(),
                    }
                })
            })
            .collect();

        Self {
            role: message.role.as_str(),
            content,
            tool_calls,
            tool_call_id: message
                .tool_call_id
                .as_deref()
                .filter(|_| message.role == MessageRole::Tool),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatResponse {
    fn into_llm_response(self, structured: bool) -> Result<LlmResponse, Report<LlmError>> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ResponseParseFailed {
                reason: "response has no choices".to_string(),
            })?;

        let content = choice.message.content.unwrap_or_default();
        let structured_output = if structured {
            serde_json::from_str(&content).ok()
        } else {
            None
        };

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| {
                // Some providers send an empty string for no-argument calls.
                let arguments = if call.function.arguments.trim().is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(&call.function.arguments).map_err(|e| {
                        LlmError::ResponseParseFailed {
                            reason: format!(
                                "arguments for tool '{}' are not JSON: {e}",
                                call.function.name
                            ),
                        }
                    })?
                };
                Ok(ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments,
                })
            })
            .collect::<Result<Vec<_>, LlmError>>()?;

        let usage = self
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            structured_output,
            tool_calls,
            usage,
            model: self.model,
            finish_reason: choice.finish_reason,
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

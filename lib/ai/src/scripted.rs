//! Deterministic backends for tests and offline demos.

use crate::backend::{EmbeddingBackend, LlmBackend, LlmProvider, LlmRequest, LlmResponse};
use crate::error::LlmError;
use async_trait::async_trait;
use rootcause::prelude::Report;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Replays queued responses in FIFO order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    queue: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    fallback: Option<LlmResponse>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedBackend {
    /// Creates a backend with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    #[must_use]
    pub fn with_response(self, response: LlmResponse) -> Self {
        self.push_response(response);
        self
    }

    /// Queues a failure.
    #[must_use]
    pub fn with_error(self, error: LlmError) -> Self {
        lock(&self.queue).push_back(Err(error));
        self
    }

    /// Response returned whenever the queue is empty.
    #[must_use]
    pub fn with_fallback(mut self, response: LlmResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Queues a response on a shared backend.
    pub fn push_response(&self, response: LlmResponse) {
        lock(&self.queue).push_back(Ok(response));
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<LlmRequest> {
        lock(&self.requests).clone()
    }

    /// Number of queued responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        lock(&self.queue).len()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, Report<LlmError>> {
        lock(&self.requests).push(request.clone());
        let next = lock(&self.queue).pop_front();
        match next {
            Some(Ok(mut response)) => {
                if response.model.is_empty() {
                    response.model = "scripted".to_string();
                }
                Ok(response)
            }
            Some(Err(error)) => Err(error.into()),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| LlmError::ScriptExhausted.into()),
        }
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Scripted
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Deterministic bag-of-words embeddings.
///
/// Each lowercase alphanumeric token is hashed into one of `dimensions`
/// buckets and the counts are L2-normalized, so texts sharing words have
/// positive cosine similarity.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedEmbedder {
    dimensions: usize,
}

impl Default for ScriptedEmbedder {
    fn default() -> Self {
        Self { dimensions: 256 }
    }
}

impl ScriptedEmbedder {
    /// Creates an embedder with `dimensions` buckets (at least one).
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embeds one text.
    #[must_use]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = fnv1a(&token.to_lowercase()) % self.dimensions as u64;
            vector[bucket as usize] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[async_trait]
impl EmbeddingBackend for ScriptedEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, Report<LlmError>> {
        Ok(inputs.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_and_records_requests() {
        let backend = ScriptedBackend::new()
            .with_response(LlmResponse::text("first"))
            .with_response(LlmResponse::text("second"));

        let a = backend
            .generate(&LlmRequest::from_prompt("one"))
            .await
            .expect("first");
        let b = backend
            .generate(&LlmRequest::from_prompt("two"))
            .await
            .expect("second");

        assert_eq!(a.content, "first");
        assert_eq!(b.content, "second");
        assert_eq!(a.model, "scripted");
        assert_eq!(backend.requests().len(), 2);
        assert_eq!(backend.remaining(), 0);
    }

    #[tokio::test]
    async fn exhausted_queue_errors_without_fallback() {
        let backend = ScriptedBackend::new();
        let err = backend
            .generate(&LlmRequest::from_prompt("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &LlmError::ScriptExhausted);
    }

    #[tokio::test]
    async fn fallback_answers_when_queue_is_empty() {
        let backend = ScriptedBackend::new().with_fallback(LlmResponse::text("default"));
        let response = backend
            .generate(&LlmRequest::from_prompt("hi"))
            .await
            .expect("fallback");
        assert_eq!(response.content, "default");
    }

    #[tokio::test]
    async fn queued_error_is_returned() {
        let backend = ScriptedBackend::new().with_error(LlmError::Timeout);
        let err = backend
            .generate(&LlmRequest::from_prompt("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &LlmError::Timeout);
    }

    #[test]
    fn shared_words_give_positive_similarity() {
        let embedder = ScriptedEmbedder::new(64);
        let a = embedder.embed_text("annual leave policy");
        let b = embedder.embed_text("How many days of annual leave?");
        let dot: f32 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        assert!(dot > 0.0);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let embedder = ScriptedEmbedder::new(8);
        assert!(embedder.embed_text("  ").iter().all(|v| *v == 0.0));
    }
}

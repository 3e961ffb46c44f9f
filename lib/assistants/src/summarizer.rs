//! Map-reduce PDF summarizer.
//!
//! Text is pulled out of the PDF, split into overlapping chunks, each chunk
//! is summarized on its own, and the partial summaries are merged into a
//! five-bullet digest.

use crate::error::AssistantError;
use futures::{StreamExt, TryStreamExt, stream};
use rootcause::prelude::{Report, ResultExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use switchboard_ai::{LlmBackend, LlmCall, PromptTemplate};
use switchboard_knowledge::TextSplitter;
use tracing::{info, instrument};

const TEMPERATURE: f32 = 0.3;
/// Passage summaries in flight at once.
const CONCURRENT_PASSAGES: usize = 4;
const PDF_CONTENT_TYPE: &str = "application/pdf";

const MAP_TEMPLATE: &str = "You will be given a single passage from a document. Create a concise summary of this passage.\nPassage: {{text}}\nCONCISE SUMMARY:";
const COMBINE_TEMPLATE: &str = "You will be given a series of summaries from a document. Create a consolidated, final summary in 5 bullet points that covers all key topics.\nSummaries: {{text}}\nFINAL BULLETED SUMMARY:";

/// Summary of one uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub summary: String,
}

/// Accepts uploads declared as PDF, or undeclared ones carrying the PDF
/// signature.
#[must_use]
pub fn is_pdf(content_type: Option<&str>, bytes: &[u8]) -> bool {
    match content_type {
        Some(declared) => declared
            .split(';')
            .next()
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE)),
        None => bytes.starts_with(b"%PDF"),
    }
}

/// The summarizer.
pub struct Summarizer {
    backend: Arc<dyn LlmBackend>,
    splitter: TextSplitter,
    map_prompt: PromptTemplate,
    combine_prompt: PromptTemplate,
}

impl Summarizer {
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            splitter: TextSplitter::new(1000, 200).with_separators(["\n\n", "\n"]),
            map_prompt: PromptTemplate::new("summarize_passage", MAP_TEMPLATE).with_required("text"),
            combine_prompt: PromptTemplate::new("combine_summaries", COMBINE_TEMPLATE)
                .with_required("text"),
        }
    }

    async fn complete(
        &self,
        template: &PromptTemplate,
        text: &str,
        step: &'static str,
    ) -> Result<String, Report<AssistantError>> {
        let values = HashMap::from([("text", text.to_string())]);
        let prompt = template
            .render(&values)
            .context(AssistantError::ModelCall { step })?;
        let result = LlmCall::new(prompt)
            .with_temperature(TEMPERATURE)
            .run(self.backend.as_ref())
            .await
            .context(AssistantError::ModelCall { step })?;
        Ok(result.content.trim().to_string())
    }

    /// Summarizes plain text.
    ///
    /// # Errors
    ///
    /// Returns `Document` if there is no text, or `ModelCall`.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub async fn summarize_text(&self, text: &str) -> Result<String, Report<AssistantError>> {
        let text = text.replace('\t', " ");
        let chunks = self.splitter.split(&text);
        if chunks.is_empty() {
            return Err(AssistantError::Document {
                reason: "no extractable text".to_string(),
            }
            .into());
        }
        info!(chunks = chunks.len(), "summarizing document");

        let passages: Vec<_> = chunks
            .iter()
            .map(|chunk| self.complete(&self.map_prompt, chunk, "passage summary"))
            .collect();
        let partials: Vec<String> = stream::iter(passages)
            .buffered(CONCURRENT_PASSAGES)
            .try_collect()
            .await?;
        self.complete(&self.combine_prompt, &partials.join("\n"), "combined summary")
            .await
    }

    /// Summarizes an uploaded PDF.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedUpload` for non-PDF uploads, `Document` if no
    /// text can be extracted, or `ModelCall`.
    pub async fn summarize_pdf(
        &self,
        filename: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<DocumentSummary, Report<AssistantError>> {
        if !is_pdf(content_type, &bytes) {
            return Err(AssistantError::UnsupportedUpload {
                reason: "Invalid file type. Please upload a PDF.".to_string(),
            }
            .into());
        }

        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| AssistantError::Document {
                reason: e.to_string(),
            })?
            .map_err(|e| AssistantError::Document {
                reason: e.to_string(),
            })?;

        Ok(DocumentSummary {
            filename: filename.to_string(),
            summary: self.summarize_text(&text).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use switchboard_ai::{LlmError, LlmProvider, LlmRequest, LlmResponse, ScriptedBackend};

    #[test]
    fn pdf_detection_prefers_declared_type() {
        assert!(is_pdf(Some("application/pdf"), b""));
        assert!(is_pdf(Some("Application/PDF; name=a.pdf"), b""));
        assert!(!is_pdf(Some("text/plain"), b"%PDF-1.7"));
        assert!(is_pdf(None, b"%PDF-1.4\n"));
        assert!(!is_pdf(None, b"hello"));
    }

    #[tokio::test]
    async fn short_text_is_mapped_then_combined() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(LlmResponse::text("Quarterly revenue grew."))
                .with_response(LlmResponse::text("- Revenue grew\n- Costs fell")),
        );
        let summarizer = Summarizer::new(Arc::clone(&backend) as Arc<dyn LlmBackend>);
        let summary = summarizer
            .summarize_text("Revenue\tgrew by 10% this quarter while costs fell.")
            .await
            .expect("summary");
        assert_eq!(summary, "- Revenue grew\n- Costs fell");

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        let map = requests[0].last_user_text().expect("map prompt");
        assert!(map.contains("Passage: Revenue grew by 10%"));
        assert!(!map.contains('\t'));
        let combine = requests[1].last_user_text().expect("combine prompt");
        assert!(combine.contains("5 bullet points"));
        assert!(combine.contains("Summaries: Quarterly revenue grew."));
        assert_eq!(requests[1].temperature, Some(0.3));
    }

    #[tokio::test]
    async fn long_text_maps_every_chunk() {
        let paragraph = "word ".repeat(150);
        let text = vec![paragraph.trim(); 4].join("\n\n");
        let backend = Arc::new(ScriptedBackend::new().with_fallback(LlmResponse::text("partial")));
        let summarizer = Summarizer::new(Arc::clone(&backend) as Arc<dyn LlmBackend>);
        let chunks = summarizer.splitter.split(&text).len();
        assert!(chunks > 1);

        summarizer.summarize_text(&text).await.expect("summary");
        assert_eq!(backend.requests().len(), chunks + 1);
    }

    /// Counts how many requests are in flight at once.
    #[derive(Default)]
    struct CountingBackend {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl LlmBackend for CountingBackend {
        async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, Report<LlmError>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(LlmResponse::text("partial"))
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::Scripted
        }

        fn model(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn passage_summaries_are_bounded() {
        let paragraph = "word ".repeat(150);
        let text = vec![paragraph.trim(); 12].join("\n\n");
        let backend = Arc::new(CountingBackend::default());
        let summarizer = Summarizer::new(Arc::clone(&backend) as Arc<dyn LlmBackend>);
        assert!(summarizer.splitter.split(&text).len() > CONCURRENT_PASSAGES);

        summarizer.summarize_text(&text).await.expect("summary");
        let peak = backend.peak.load(Ordering::SeqCst);
        assert!(peak > 1, "passages should overlap, peak {peak}");
        assert!(peak <= CONCURRENT_PASSAGES, "peak {peak}");
    }

    #[tokio::test]
    async fn non_pdf_upload_is_a_client_error() {
        let summarizer = Summarizer::new(Arc::new(ScriptedBackend::new()));
        let err = summarizer
            .summarize_pdf("notes.txt", Some("text/plain"), b"plain".to_vec())
            .await
            .unwrap_err();
        assert!(err.current_context().is_client_error());
    }

    #[tokio::test]
    async fn unreadable_pdf_is_a_document_error() {
        let summarizer = Summarizer::new(Arc::new(ScriptedBackend::new()));
        let err = summarizer
            .summarize_pdf("broken.pdf", Some("application/pdf"), b"%PDF-1.4 not really".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err.current_context(), AssistantError::Document { .. }));
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let summarizer = Summarizer::new(Arc::new(ScriptedBackend::new()));
        let err = summarizer.summarize_text("   ").await.unwrap_err();
        assert!(matches!(err.current_context(), AssistantError::Document { .. }));
    }
}

//! Tourism question router.
//!
//! A question is classified into one of three cities, answered from that
//! city's place collection, or turned away when it fits none of them.

use crate::error::AssistantError;
use rootcause::prelude::{Report, ResultExt};
use serde::Serialize;
use std::sync::Arc;
use switchboard_ai::{AiError, Classifier, EmbeddingBackend, LlmBackend, LlmCall, LlmMessage};
use switchboard_core::require_text;
use switchboard_knowledge::{KnowledgeBase, join_context};
use tracing::{info, instrument};

/// Places retrieved per question.
pub const TOURISM_TOP_K: usize = 10;

/// Reply for questions outside the supported cities.
pub const UNCLASSIFIED_REPLY: &str = "Sorry, I can only answer questions about places in Bangkok, Chiang Mai, or Phuket.";

const CLASSIFY_PROMPT: &str = "You are a helpful classification assistant. Classify the following question into one of these categories: Bangkok location, Chiang Mai location, Phuket location, or Unclassified.";
const ANSWER_TEMPERATURE: f32 = 0.5;

/// Routing categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Bangkok,
    ChiangMai,
    Phuket,
    Unclassified,
}

impl Category {
    const LABELS: [&'static str; 4] = ["Bangkok", "ChiangMai", "Phuket", "Unclassified"];

    /// The classifier label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Bangkok => "Bangkok",
            Self::ChiangMai => "ChiangMai",
            Self::Phuket => "Phuket",
            Self::Unclassified => "Unclassified",
        }
    }

    fn from_label(label: &str) -> Self {
        match label {
            "Bangkok" => Self::Bangkok,
            "ChiangMai" => Self::ChiangMai,
            "Phuket" => Self::Phuket,
            _ => Self::Unclassified,
        }
    }

    /// The knowledge collection holding the city's places.
    #[must_use]
    pub fn collection(self) -> Option<&'static str> {
        match self {
            Self::Bangkok => Some("bangkok_tourism_places"),
            Self::ChiangMai => Some("chiangmai_tourism_places"),
            Self::Phuket => Some("phuket_tourism_places"),
            Self::Unclassified => None,
        }
    }

    fn city(self) -> &'static str {
        match self {
            Self::Bangkok => "Bangkok",
            Self::ChiangMai => "Chiang Mai",
            Self::Phuket => "Phuket",
            Self::Unclassified => "Thailand",
        }
    }
}

/// Category and answer returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TourismAnswer {
    pub category: String,
    pub answer: String,
}

/// The tourism router.
pub struct TourismGuide {
    backend: Arc<dyn LlmBackend>,
    embedder: Arc<dyn EmbeddingBackend>,
    knowledge: Arc<KnowledgeBase>,
    classifier: Classifier,
}

impl TourismGuide {
    #[must_use]
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        embedder: Arc<dyn EmbeddingBackend>,
        knowledge: Arc<KnowledgeBase>,
    ) -> Self {
        Self {
            backend,
            embedder,
            knowledge,
            classifier: Classifier::new("category", Category::LABELS)
                .with_description("The city the question is about")
                .with_temperature(0.0),
        }
    }

    /// Classifies the question; an answer outside the label set counts as
    /// unclassified.
    async fn classify(&self, question: &str) -> Result<Category, Report<AssistantError>> {
        let history = [LlmMessage::user(format!(
            "Question: {question}\n\nClassification:"
        ))];
        match self
            .classifier
            .classify(self.backend.as_ref(), CLASSIFY_PROMPT, &history)
            .await
        {
            Ok(label) => Ok(Category::from_label(&label)),
            Err(report) => match report.current_context() {
                AiError::LabelOutOfSet { .. } => Ok(Category::Unclassified),
                _ => Err(report).context(AssistantError::ModelCall {
                    step: "tourism classification",
                }),
            },
        }
    }

    /// Answers `question` from the matching city's places.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank question, `Retrieval` when the
    /// lookup fails, or `ModelCall`.
    #[instrument(skip_all)]
    pub async fn ask(&self, question: &str) -> Result<TourismAnswer, Report<AssistantError>> {
        let question = require_text("question", question).map_err(AssistantError::from)?;
        let category = self.classify(question).await?;
        info!(category = category.label(), "question classified");

        let Some(collection) = category.collection() else {
            return Ok(TourismAnswer {
                category: category.label().to_string(),
                answer: UNCLASSIFIED_REPLY.to_string(),
            });
        };

        let hits = self
            .knowledge
            .retrieve(collection, question, self.embedder.as_ref(), TOURISM_TOP_K)
            .await
            .context(AssistantError::Retrieval {
                collection: collection.to_string(),
            })?;
        let system = format!(
            "You are a helpful assistant for {city} tourism. \
             You can answer questions about tourist attractions, travel planning, transportation, food, culture, and more related to {city}. \
             Use the provided context below when relevant.",
            city = category.city()
        );
        let prompt = format!(
            "--- CONTEXT ---\n{}\n--- END CONTEXT ---\n\nQuestion: {question}\nAnswer:",
            join_context(&hits)
        );
        let result = LlmCall::new(prompt)
            .with_system_prompt(system)
            .with_temperature(ANSWER_TEMPERATURE)
            .run(self.backend.as_ref())
            .await
            .context(AssistantError::ModelCall {
                step: "tourism answer",
            })?;

        Ok(TourismAnswer {
            category: category.label().to_string(),
            answer: result.content.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};
    use switchboard_ai::{LlmResponse, ScriptedBackend, ScriptedEmbedder};

    async fn guide(backend: &Arc<ScriptedBackend>) -> TourismGuide {
        let embedder: Arc<dyn EmbeddingBackend> = Arc::new(ScriptedEmbedder::default());
        let knowledge = Arc::new(KnowledgeBase::in_memory());
        knowledge
            .ingest(
                "phuket_tourism_places",
                "The location's name is Patong Beach. It is a beach located in the Kathu district.",
                Map::new(),
                embedder.as_ref(),
            )
            .await
            .expect("ingest");
        TourismGuide::new(Arc::clone(backend) as Arc<dyn LlmBackend>, embedder, knowledge)
    }

    fn category(label: &str) -> LlmResponse {
        LlmResponse::structured(json!({ "category": label }))
    }

    #[tokio::test]
    async fn city_question_uses_city_collection() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(category("Phuket"))
                .with_response(LlmResponse::text("Visit Patong Beach.\n")),
        );
        let answer = guide(&backend).await.ask("Which beach should I visit?").await.expect("ask");
        assert_eq!(answer, TourismAnswer {
            category: "Phuket".to_string(),
            answer: "Visit Patong Beach.".to_string(),
        });

        let request = &backend.requests()[1];
        assert!(request.system().is_some_and(|s| s.contains("Phuket tourism")));
        assert!(request.last_user_text().is_some_and(|u| u.contains("Patong Beach")));
    }

    #[tokio::test]
    async fn empty_city_collection_still_answers() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(category("ChiangMai"))
                .with_response(LlmResponse::text("Doi Suthep is worth a visit.")),
        );
        let answer = guide(&backend).await.ask("What temple is famous?").await.expect("ask");
        assert_eq!(answer.category, "ChiangMai");
        let prompt = backend.requests()[1].last_user_text().map(str::to_string);
        assert_eq!(
            prompt.as_deref(),
            Some("--- CONTEXT ---\n\n--- END CONTEXT ---\n\nQuestion: What temple is famous?\nAnswer:")
        );
    }

    #[tokio::test]
    async fn unclassified_and_unknown_labels_get_fixed_reply() {
        for label in ["Unclassified", "Paris"] {
            let backend = Arc::new(ScriptedBackend::new().with_response(category(label)));
            let answer = guide(&backend).await.ask("How do I cook pasta?").await.expect("ask");
            assert_eq!(answer.category, "Unclassified");
            assert_eq!(answer.answer, UNCLASSIFIED_REPLY);
            assert_eq!(backend.requests().len(), 1);
        }
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let backend = Arc::new(ScriptedBackend::new());
        let err = guide(&backend).await.ask(" \n").await.unwrap_err();
        assert!(err.current_context().is_client_error());
    }
}

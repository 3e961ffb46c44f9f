//! Forced-choice classification.
//!
//! A `Classifier` asks the model to fill one field whose value must be drawn
//! from a closed label set. The provider is told to enforce the set through a
//! strict JSON schema, and the answer is checked again here.

use crate::backend::{LlmBackend, LlmMessage, OutputSchema};
use crate::error::AiError;
use crate::llm_call::{LlmCall, parse_json_content};
use rootcause::prelude::Report;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

/// A closed-set classification over one output field.
#[derive(Debug, Clone)]
pub struct Classifier {
    field: String,
    labels: Vec<String>,
    description: String,
    temperature: Option<f32>,
}

impl Classifier {
    /// Creates a classifier writing one of `labels` into `field`.
    #[must_use]
    pub fn new<I, S>(field: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            labels: labels.into_iter().map(Into::into).collect(),
            description: String::new(),
            temperature: Some(0.0),
        }
    }

    /// Describes the field to the model.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Overrides the sampling temperature (default 0).
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// The allowed labels, in declaration order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The strict schema sent to the provider.
    #[must_use]
    pub fn output_schema(&self) -> OutputSchema {
        let mut property = serde_json::json!({
            "type": "string",
            "enum": self.labels,
        });
        if !self.description.is_empty() {
            property["description"] = JsonValue::String(self.description.clone());
        }
        let mut properties = serde_json::Map::new();
        properties.insert(self.field.clone(), property);
        OutputSchema::strict(
            format!("{}_decision", self.field),
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": [self.field],
                "additionalProperties": false,
            }),
        )
    }

    /// Classifies the conversation, returning a label from the closed set.
    ///
    /// # Errors
    ///
    /// Returns `AiError::LabelOutOfSet` if the model answers outside the set,
    /// `AiError::SchemaValidationFailed` if the field is missing, or the
    /// wrapped backend failure.
    pub async fn classify(
        &self,
        backend: &dyn LlmBackend,
        system: &str,
        history: &[LlmMessage],
    ) -> Result<String, Report<AiError>> {
        let mut call = LlmCall::from_history(history.to_vec())
            .with_system_prompt(system)
            .with_output_schema(self.output_schema());
        if let Some(temperature) = self.temperature {
            call = call.with_temperature(temperature);
        }

        let result = call.run(backend).await?;
        let value = match result.structured_output {
            Some(value) => value,
            None => parse_json_content(&result.content)?,
        };
        let label = value
            .get(&self.field)
            .and_then(JsonValue::as_str)
            .ok_or_else(|| AiError::SchemaValidationFailed {
                expected: format!("object with string field '{}'", self.field),
                actual: value.to_string(),
            })?;

        if self.labels.iter().any(|l| l == label) {
            debug!(field = %self.field, label, "classified");
            Ok(label.to_string())
        } else {
            warn!(field = %self.field, label, "model answered outside the label set");
            Err(AiError::LabelOutOfSet {
                label: label.to_string(),
                allowed: self.labels.clone(),
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LlmResponse;
    use crate::scripted::ScriptedBackend;

    fn router() -> Classifier {
        Classifier::new("next", ["PricingAgent", "WarrantyAgent", "FINISH"])
            .with_description("Which worker should act next")
    }

    #[test]
    fn schema_enumerates_labels() {
        let schema = router().output_schema();
        assert!(schema.strict);
        assert_eq!(
            schema.schema["properties"]["next"]["enum"],
            serde_json::json!(["PricingAgent", "WarrantyAgent", "FINISH"])
        );
        assert_eq!(schema.schema["required"], serde_json::json!(["next"]));
    }

    #[tokio::test]
    async fn returns_label_in_set() {
        let backend = ScriptedBackend::new()
            .with_response(LlmResponse::structured(serde_json::json!({"next": "FINISH"})));
        let label = router()
            .classify(&backend, "route", &[LlmMessage::user("thanks, bye")])
            .await
            .expect("classify");
        assert_eq!(label, "FINISH");

        let sent = backend.requests();
        assert_eq!(sent[0].output_schema, Some(router().output_schema()));
        assert_eq!(sent[0].temperature, Some(0.0));
    }

    #[tokio::test]
    async fn label_outside_set_is_an_error() {
        let backend = ScriptedBackend::new()
            .with_response(LlmResponse::structured(serde_json::json!({"next": "SalesAgent"})));
        let err = router()
            .classify(&backend, "route", &[LlmMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            AiError::LabelOutOfSet { label, .. } if label == "SalesAgent"
        ));
    }

    #[tokio::test]
    async fn missing_field_is_schema_failure() {
        let backend = ScriptedBackend::new()
            .with_response(LlmResponse::text("{\"route\": \"FINISH\"}"));
        let err = router()
            .classify(&backend, "route", &[LlmMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            AiError::SchemaValidationFailed { .. }
        ));
    }
}

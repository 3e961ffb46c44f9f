//! Detect-and-translate.

use crate::error::AssistantError;
use rootcause::prelude::{Report, ResultExt};
use std::collections::HashMap;
use std::sync::Arc;
use switchboard_ai::{LlmBackend, LlmCall, PromptTemplate};
use switchboard_core::require_text;
use tracing::instrument;

const TEMPERATURE: f32 = 0.1;

const TRANSLATE_TEMPLATE: &str = "You are an expert multilingual translator.
First, automatically detect the language of the text below.
Then, translate it to {{target_language}}.
Provide only the translated text as the output, with no additional explanations or preamble.
Ensure the translation is accurate and natural-sounding.

Text to translate:
---
{{text}}";

/// Translates free text into a requested language.
pub struct Translator {
    backend: Arc<dyn LlmBackend>,
    template: PromptTemplate,
}

impl Translator {
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            template: PromptTemplate::new("translate", TRANSLATE_TEMPLATE)
                .with_required("text")
                .with_required("target_language"),
        }
    }

    /// Returns the translation of `text`, trimmed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if either field is blank, or `Unavailable`
    /// when the model cannot be reached.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, Report<AssistantError>> {
        let text = require_text("text", text).map_err(AssistantError::from)?;
        let target_language =
            require_text("target_language", target_language).map_err(AssistantError::from)?;

        let values = HashMap::from([
            ("text", text.to_string()),
            ("target_language", target_language.to_string()),
        ]);
        let prompt = self
            .template
            .render(&values)
            .context(AssistantError::ModelCall { step: "translation prompt" })?;
        let result = LlmCall::new(prompt)
            .with_temperature(TEMPERATURE)
            .run(self.backend.as_ref())
            .await
            .context(AssistantError::Unavailable {
                service: "translation",
            })?;
        Ok(result.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_ai::{LlmError, LlmResponse, ScriptedBackend};

    #[tokio::test]
    async fn translation_is_trimmed_and_prompt_names_target() {
        let backend = Arc::new(ScriptedBackend::new().with_response(LlmResponse::text("\nสวัสดี\n")));
        let translator = Translator::new(Arc::clone(&backend) as Arc<dyn LlmBackend>);
        let translated = translator.translate("Hello", "Thai").await.expect("translate");
        assert_eq!(translated, "สวัสดี");

        let request = &backend.requests()[0];
        let prompt = request.last_user_text().expect("prompt");
        assert!(prompt.contains("translate it to Thai."));
        assert!(prompt.ends_with("---\nHello"));
        assert_eq!(request.temperature, Some(0.1));
    }

    #[tokio::test]
    async fn blank_fields_are_client_errors() {
        let translator = Translator::new(Arc::new(ScriptedBackend::new()));
        for (text, target) in [("", "Thai"), ("Hello", "  ")] {
            let err = translator.translate(text, target).await.unwrap_err();
            assert!(err.current_context().is_client_error());
        }
    }

    #[tokio::test]
    async fn backend_failure_is_unavailable() {
        let backend = ScriptedBackend::new().with_error(LlmError::RequestFailed {
            status: Some(502),
            reason: "bad gateway".to_string(),
        });
        let translator = Translator::new(Arc::new(backend));
        let err = translator.translate("Hello", "Thai").await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            AssistantError::Unavailable { service: "translation" }
        ));
    }
}

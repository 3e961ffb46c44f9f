//! Prompt templates.
//!
//! Templates use `{{name}}` placeholders. Variables may be declared required
//! or given a default; rendering fails if a required variable has no value.

use crate::error::PromptError;
use rootcause::prelude::Report;
use std::collections::HashMap;

/// Definition of a template variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDefinition {
    /// Whether this variable is required.
    pub required: bool,
    /// Default value if not provided.
    pub default: Option<String>,
}

impl VariableDefinition {
    /// A variable that must be supplied.
    #[must_use]
    pub fn required() -> Self {
        Self {
            required: true,
            default: None,
        }
    }

    /// A variable that falls back to `default`.
    #[must_use]
    pub fn with_default(default: impl Into<String>) -> Self {
        Self {
            required: false,
            default: Some(default.into()),
        }
    }
}

/// A named prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Template name (used for lookup).
    pub name: String,
    /// Template content with placeholders.
    pub content: String,
    /// Declared variables.
    pub variables: HashMap<String, VariableDefinition>,
}

impl PromptTemplate {
    /// Creates a template with no declared variables.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            variables: HashMap::new(),
        }
    }

    /// Declares a required variable.
    #[must_use]
    pub fn with_required(mut self, name: impl Into<String>) -> Self {
        self.variables
            .insert(name.into(), VariableDefinition::required());
        self
    }

    /// Declares a variable with a default value.
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>, default: impl Into<String>) -> Self {
        self.variables
            .insert(name.into(), VariableDefinition::with_default(default));
        self
    }

    /// Returns the required variables missing from `values`, sorted.
    #[must_use]
    pub fn missing_variables(&self, values: &HashMap<&str, String>) -> Vec<String> {
        let mut missing: Vec<String> = self
            .variables
            .iter()
            .filter(|(name, def)| def.required && !values.contains_key(name.as_str()))
            .map(|(name, _)| name.clone())
            .collect();
        missing.sort();
        missing
    }

    /// Renders the template.
    ///
    /// Placeholders are resolved in one pass over the template, so text
    /// inside a substituted value is never expanded. Supplied values win over
    /// defaults. Placeholders without a value are left in place.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::MissingVariables` if a required variable has no
    /// value.
    pub fn render(&self, values: &HashMap<&str, String>) -> Result<String, Report<PromptError>> {
        let missing = self.missing_variables(values);
        if !missing.is_empty() {
            return Err(PromptError::MissingVariables {
                template: self.name.clone(),
                variables: missing,
            }
            .into());
        }

        let mut rendered = String::with_capacity(self.content.len());
        let mut rest = self.content.as_str();
        while let Some(start) = rest.find("{{") {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                rest = &rest[start..];
                break;
            };
            let name = &after[..end];
            match self.resolve(name, values) {
                Some(value) => rendered.push_str(value),
                None => rendered.push_str(&rest[start..start + end + 4]),
            }
            rest = &after[end + 2..];
        }
        rendered.push_str(rest);
        Ok(rendered)
    }

    fn resolve<'a>(&'a self, name: &str, values: &'a HashMap<&str, String>) -> Option<&'a str> {
        values
            .get(name)
            .map(String::as_str)
            .or_else(|| self.variables.get(name)?.default.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tourism() -> PromptTemplate {
        PromptTemplate::new(
            "tourism",
            "You are a {{city}} travel guide. Tone: {{tone}}.\nContext:\n{{context}}",
        )
        .with_required("city")
        .with_required("context")
        .with_default("tone", "friendly")
    }

    #[test]
    fn renders_values_and_defaults() {
        let values = HashMap::from([
            ("city", "Phuket".to_string()),
            ("context", "Patong beach".to_string()),
        ]);
        let rendered = tourism().render(&values).expect("render");
        assert_eq!(
            rendered,
            "You are a Phuket travel guide. Tone: friendly.\nContext:\nPatong beach"
        );
    }

    #[test]
    fn supplied_value_overrides_default() {
        let values = HashMap::from([
            ("city", "Bangkok".to_string()),
            ("context", "-".to_string()),
            ("tone", "formal".to_string()),
        ]);
        assert!(tourism().render(&values).expect("render").contains("formal"));
    }

    #[test]
    fn missing_required_variables_fail() {
        let values = HashMap::from([("city", "Bangkok".to_string())]);
        let err = tourism().render(&values).unwrap_err();
        assert_eq!(
            err.current_context(),
            &PromptError::MissingVariables {
                template: "tourism".to_string(),
                variables: vec!["context".to_string()],
            }
        );
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let template = PromptTemplate::new("pair", "A={{a}} B={{b}}");
        let values = HashMap::from([("a", "{{b}}".to_string()), ("b", "x".to_string())]);
        assert_eq!(template.render(&values).expect("render"), "A={{b}} B=x");

        let template = PromptTemplate::new("question", "Q={{q}} T={{tone}}")
            .with_required("q")
            .with_default("tone", "friendly");
        let values = HashMap::from([("q", "what is {{tone}}?".to_string())]);
        assert_eq!(
            template.render(&values).expect("render"),
            "Q=what is {{tone}}? T=friendly"
        );
    }

    #[test]
    fn unknown_and_unterminated_placeholders_are_kept() {
        let template = PromptTemplate::new("raw", "{{unknown}} and {{open");
        assert_eq!(
            template.render(&HashMap::new()).expect("render"),
            "{{unknown}} and {{open"
        );
    }
}

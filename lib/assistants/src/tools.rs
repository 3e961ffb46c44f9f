//! Helpers shared by the assistants' tool definitions.

use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};
use switchboard_ai::ToolSpec;
use switchboard_conversation::ToolError;

/// Decodes closure-tool arguments, naming the tool on failure.
pub(crate) fn decode_args<T: DeserializeOwned>(
    tool: &str,
    input: JsonValue,
) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::InvalidInput {
        name: tool.to_string(),
        reason: e.to_string(),
    })
}

/// Spec for a tool taking required string arguments.
pub(crate) fn string_args_spec(
    name: &str,
    description: &str,
    args: &[(&str, &str)],
    required: &[&str],
) -> ToolSpec {
    let properties: serde_json::Map<String, JsonValue> = args
        .iter()
        .map(|(arg, help)| {
            (
                (*arg).to_string(),
                json!({"type": "string", "description": help}),
            )
        })
        .collect();
    ToolSpec::new(name, description).with_parameters(json!({
        "type": "object",
        "properties": properties,
        "required": required,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct QueryArgs {
        query: String,
    }

    #[test]
    fn spec_lists_required_arguments() {
        let spec = string_args_spec(
            "get_price_details",
            "Current price",
            &[("product_name", "Product to price")],
            &["product_name"],
        );
        assert_eq!(spec.parameters["required"][0], "product_name");
        assert_eq!(
            spec.parameters["properties"]["product_name"]["type"],
            "string"
        );
    }

    #[test]
    fn decode_reports_tool_name() {
        let err = decode_args::<QueryArgs>("search", json!({"q": 1})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput { ref name, .. } if name == "search"));
        let ok: QueryArgs = decode_args("search", json!({"query": "sofa"})).expect("decode");
        assert_eq!(ok.query, "sofa");
    }
}

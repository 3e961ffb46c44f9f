//! Quotation extraction from a photographed or scanned order.
//!
//! Two vision calls read the customer block and the item lines; totals are
//! computed locally so the model never does arithmetic.

use crate::error::AssistantError;
use chrono::Utc;
use rootcause::prelude::{Report, ResultExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use switchboard_ai::{LlmBackend, LlmCall, LlmMessage, OutputSchema};
use tracing::{info, instrument};

/// VAT applied to the subtotal.
pub const VAT_RATE: f64 = 0.06;

const MAX_TOKENS: u32 = 2000;

const CUSTOMER_PROMPT: &str = "Please extract the customer's contact information. IMPORTANT: You must ONLY extract the customer's address (recipient/Bill To), not the sender's address. If a field isn't present, its value will be null.";
const ITEMS_PROMPT: &str = "Extract each item from the receipt image.";

/// Recipient details; any field may be missing from the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub telephone_number: Option<String>,
}

/// An item line as read from the image; `price` is per unit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedItem {
    pub item_name: String,
    pub amount: u32,
    pub unit: String,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
struct ExtractedItems {
    items: Vec<ExtractedItem>,
}

/// A numbered quotation line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotationLine {
    pub line: usize,
    pub item_name: String,
    pub amount: u32,
    pub unit: String,
    pub unit_price: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quotation {
    pub date: String,
    pub customer: CustomerInfo,
    pub items: Vec<QuotationLine>,
    pub subtotal: f64,
    pub vat_rate: f64,
    pub vat: f64,
    pub total: f64,
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Quotation {
    /// Numbers the lines from 1 and computes the totals.
    #[must_use]
    pub fn build(customer: CustomerInfo, items: Vec<ExtractedItem>, date: String) -> Self {
        let items: Vec<QuotationLine> = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| QuotationLine {
                line: idx + 1,
                total: round_cents(item.price * f64::from(item.amount)),
                item_name: item.item_name,
                amount: item.amount,
                unit: item.unit,
                unit_price: item.price,
            })
            .collect();
        let subtotal = round_cents(items.iter().map(|l| l.total).sum());
        let vat = round_cents(subtotal * VAT_RATE);
        Self {
            date,
            customer,
            items,
            subtotal,
            vat_rate: VAT_RATE,
            vat,
            total: round_cents(subtotal + vat),
        }
    }
}

fn customer_schema() -> JsonValue {
    let field = |description: &str| json!({"type": ["string", "null"], "description": description});
    json!({
        "type": "object",
        "properties": {
            "name": field("The customer's full name or company name."),
            "address": field("The customer's full mailing address."),
            "email": field("The customer's email address."),
            "telephone_number": field("The customer's telephone number.")
        },
        "required": ["name", "address", "email", "telephone_number"],
        "additionalProperties": false
    })
}

fn items_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "item_name": {"type": "string", "description": "The name of the purchased item."},
                        "amount": {"type": "integer", "description": "The quantity of the item purchased."},
                        "unit": {"type": "string", "description": "The unit for the amount (e.g., 'pcs', 'kg'). Default is 'หน่วย'."},
                        "price": {"type": "number", "description": "The price of one unit of the item."}
                    },
                    "required": ["item_name", "amount", "unit", "price"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["items"],
        "additionalProperties": false
    })
}

/// Reads quotations from images.
pub struct QuotationExtractor {
    backend: Arc<dyn LlmBackend>,
}

impl QuotationExtractor {
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    async fn extract<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: OutputSchema,
        mime_type: &str,
        image: &[u8],
        step: &'static str,
    ) -> Result<T, Report<AssistantError>> {
        LlmCall::from_history(vec![LlmMessage::user(prompt).with_image_bytes(mime_type, image)])
            .with_output_schema(schema)
            .with_max_tokens(MAX_TOKENS)
            .run_structured(self.backend.as_ref())
            .await
            .context(AssistantError::ModelCall { step })
    }

    /// Extracts and prices the quotation shown in `image`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedUpload` unless the upload is a non-empty image,
    /// or `ModelCall` if either extraction fails.
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    pub async fn extract_quotation(
        &self,
        content_type: Option<&str>,
        image: &[u8],
    ) -> Result<Quotation, Report<AssistantError>> {
        let mime_type = content_type
            .filter(|mime| mime.starts_with("image/"))
            .ok_or_else(|| AssistantError::UnsupportedUpload {
                reason: "Invalid file type. Please upload an image.".to_string(),
            })?;
        if image.is_empty() {
            return Err(AssistantError::UnsupportedUpload {
                reason: "The uploaded image is empty.".to_string(),
            }
            .into());
        }

        let (customer, items) = tokio::try_join!(
            self.extract::<CustomerInfo>(
                CUSTOMER_PROMPT,
                OutputSchema::strict("customer_info", customer_schema()),
                mime_type,
                image,
                "customer extraction",
            ),
            self.extract::<ExtractedItems>(
                ITEMS_PROMPT,
                OutputSchema::strict("receipt_items", items_schema()),
                mime_type,
                image,
                "item extraction",
            ),
        )?;

        let quotation = Quotation::build(
            customer,
            items.items,
            Utc::now().date_naive().format("%Y-%m-%d").to_string(),
        );
        info!(lines = quotation.items.len(), total = quotation.total, "quotation extracted");
        Ok(quotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_ai::{LlmResponse, ScriptedBackend};

    fn item(name: &str, amount: u32, price: f64) -> ExtractedItem {
        ExtractedItem {
            item_name: name.to_string(),
            amount,
            unit: "pcs".to_string(),
            price,
        }
    }

    #[test]
    fn totals_include_six_percent_vat() {
        let quotation = Quotation::build(
            CustomerInfo::default(),
            vec![item("Cable", 3, 19.99), item("Switch", 2, 450.0)],
            "2024-05-01".to_string(),
        );
        assert_eq!(quotation.items[0].line, 1);
        assert_eq!(quotation.items[1].line, 2);
        assert_eq!(quotation.items[0].total, 59.97);
        assert_eq!(quotation.items[1].total, 900.0);
        assert_eq!(quotation.subtotal, 959.97);
        assert_eq!(quotation.vat, 57.6);
        assert_eq!(quotation.total, 1017.57);
    }

    #[test]
    fn empty_quotation_totals_zero() {
        let quotation = Quotation::build(CustomerInfo::default(), Vec::new(), "2024-05-01".to_string());
        assert!(quotation.items.is_empty());
        assert_eq!(quotation.total, 0.0);
    }

    #[tokio::test]
    async fn image_is_sent_to_both_extractions() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_response(LlmResponse::structured(json!({
                    "name": "Smart Office Co.",
                    "address": null,
                    "email": "buyer@example.com",
                    "telephone_number": null
                })))
                .with_response(LlmResponse::structured(json!({
                    "items": [{"item_name": "Desk", "amount": 2, "unit": "pcs", "price": 100.0}]
                }))),
        );
        let extractor = QuotationExtractor::new(Arc::clone(&backend) as Arc<dyn LlmBackend>);
        let quotation = extractor
            .extract_quotation(Some("image/png"), b"\x89PNG")
            .await
            .expect("quotation");

        assert_eq!(quotation.customer.name.as_deref(), Some("Smart Office Co."));
        assert!(quotation.customer.address.is_none());
        assert_eq!(quotation.items.len(), 1);
        assert_eq!(quotation.subtotal, 200.0);
        assert_eq!(quotation.vat, 12.0);
        assert_eq!(quotation.total, 212.0);

        for request in backend.requests() {
            let turn = request.messages.last().expect("user turn");
            assert_eq!(turn.images, vec!["data:image/png;base64,iVBORw==".to_string()]);
            assert_eq!(request.max_tokens, Some(2000));
        }
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected() {
        let backend = Arc::new(ScriptedBackend::new());
        let extractor = QuotationExtractor::new(Arc::clone(&backend) as Arc<dyn LlmBackend>);
        for content_type in [Some("application/pdf"), None] {
            let err = extractor.extract_quotation(content_type, b"data").await.unwrap_err();
            assert!(err.current_context().is_client_error());
        }
        let err = extractor.extract_quotation(Some("image/jpeg"), b"").await.unwrap_err();
        assert!(err.current_context().is_client_error());
        assert!(backend.requests().is_empty());
    }
}

//! Furniture catalog lookups used by the call-center specialists.

use crate::tools::{decode_args, string_args_spec};
use serde::Deserialize;
use switchboard_conversation::{FnTool, ToolRegistry};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct QueryArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct ProductArgs {
    product_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct WarrantyFormArgs {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    invoice_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Product {
    Sofa,
    Desk,
}

fn find_product(text: &str) -> Option<Product> {
    let text = text.to_lowercase();
    if text.contains("sofa") {
        Some(Product::Sofa)
    } else if text.contains("desk") {
        Some(Product::Desk)
    } else {
        None
    }
}

/// Dimensions of the product mentioned in `query`.
#[must_use]
pub fn space_details(query: &str) -> String {
    debug!(query, "space details lookup");
    match find_product(query) {
        Some(Product::Sofa) => {
            "The Grand Comfort Sofa is 220cm wide, 95cm deep, and 80cm high.".to_string()
        }
        Some(Product::Desk) => {
            "The Executive Desk is 150cm wide, 75cm deep, and 78cm high.".to_string()
        }
        None => "Could not find space details for the specified product.".to_string(),
    }
}

/// Origin and materials of the product mentioned in `query`.
#[must_use]
pub fn product_origin(query: &str) -> String {
    match find_product(query) {
        Some(Product::Sofa) => {
            "The Grand Comfort Sofa is handcrafted in Italy using premium leather.".to_string()
        }
        Some(Product::Desk) => "The Executive Desk is made from sustainable American oak.".to_string(),
        None => "Could not find origin details for the specified product.".to_string(),
    }
}

/// Current price of a product.
#[must_use]
pub fn price_details(product_name: &str) -> String {
    match find_product(product_name) {
        Some(Product::Sofa) => "The Grand Comfort Sofa is priced at $1,500.".to_string(),
        Some(Product::Desk) => "The Executive Desk is priced at $800.".to_string(),
        None => "Product not found. Please specify the product name.".to_string(),
    }
}

/// Running promotions for a product.
#[must_use]
pub fn available_discounts(product_name: &str) -> String {
    match find_product(product_name) {
        Some(Product::Sofa) => {
            "There is a 10% summer sale discount on the Grand Comfort Sofa.".to_string()
        }
        _ => "There are currently no special discounts for the Executive Desk.".to_string(),
    }
}

/// Warranty terms; every product has the same policy.
#[must_use]
pub fn warranty_policy(product_name: &str) -> String {
    format!(
        "All our products, including the {product_name}, come with a 2-year standard warranty covering manufacturing defects."
    )
}

/// Link to the claim form, or a request for the missing details.
#[must_use]
pub fn warranty_form(product_name: Option<&str>, invoice_id: Option<&str>) -> String {
    let product = product_name.map(str::trim).filter(|s| !s.is_empty());
    let invoice = invoice_id.map(str::trim).filter(|s| !s.is_empty());
    match (product, invoice) {
        (Some(product), Some(invoice)) => format!(
            "To file a warranty claim for your {product} (Invoice #{invoice}), please visit our website at example.com/warranty-claim?product={}&invoice={invoice}",
            product.replace(' ', "+")
        ),
        _ => "The product name and invoice ID are both required to get the warranty form link. Please ask the user for the missing information.".to_string(),
    }
}

fn query_tool(name: &'static str, description: &str, lookup: fn(&str) -> String) -> FnTool {
    FnTool::new(
        string_args_spec(
            name,
            description,
            &[("query", "The product the customer is asking about")],
            &["query"],
        ),
        move |input| {
            let args: QueryArgs = decode_args(name, input)?;
            Ok(lookup(&args.query))
        },
    )
}

fn product_tool(name: &'static str, description: &str, lookup: fn(&str) -> String) -> FnTool {
    FnTool::new(
        string_args_spec(
            name,
            description,
            &[("product_name", "Name of the product")],
            &["product_name"],
        ),
        move |input| {
            let args: ProductArgs = decode_args(name, input)?;
            Ok(lookup(&args.product_name))
        },
    )
}

/// Tools for the product detail specialist.
#[must_use]
pub fn product_detail_tools() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(query_tool(
            "get_space_details",
            "Provides detailed specifications and dimensions of a product.",
            space_details,
        ))
        .with_tool(query_tool(
            "get_product_origin",
            "Provides information about the origin and materials of a product.",
            product_origin,
        ))
}

/// Tools for the pricing specialist.
#[must_use]
pub fn pricing_tools() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(product_tool(
            "get_price_details",
            "Provides the current price of a specific product.",
            price_details,
        ))
        .with_tool(product_tool(
            "get_available_discounts",
            "Checks for any available discounts or promotions for a product.",
            available_discounts,
        ))
}

/// Tools for the warranty specialist.
#[must_use]
pub fn warranty_tools() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(product_tool(
            "get_warranty_policy",
            "Provides the warranty policy details for a specific product.",
            warranty_policy,
        ))
        .with_tool(FnTool::new(
            string_args_spec(
                "get_warranty_form",
                "Provides a link to the warranty claim form, which requires a product name and an invoice ID. If the invoice ID is missing from the user's query, you must ask the user for it.",
                &[
                    ("product_name", "Name of the product"),
                    ("invoice_id", "Invoice number from the purchase"),
                ],
                &[],
            ),
            |input| {
                let args: WarrantyFormArgs = decode_args("get_warranty_form", input)?;
                Ok(warranty_form(
                    args.product_name.as_deref(),
                    args.invoice_id.as_deref(),
                ))
            },
        ))
}

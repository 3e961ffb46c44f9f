//! HTTP routes.

mod chat;
mod documents;
mod knowledge;
mod tasks;

use crate::AppState;
use crate::config::ServerConfig;
use crate::error::ApiError;
use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Json;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Largest accepted request body, uploads included.
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Builds the application router.
pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/chat", post(chat::call_center))
        .route("/invoke", post(chat::invoke))
        .route("/history/{thread_id}", get(chat::history))
        .route("/hr/chat", post(chat::hr_chat))
        .route("/tourism/ask", post(tasks::tourism))
        .route("/generate_report", post(tasks::generate_report))
        .route("/sales/query", post(tasks::sales_query))
        .route("/translate", post(tasks::translate))
        .route("/run-simulation", post(tasks::run_simulation))
        .route("/summarize", post(documents::summarize))
        .route("/generate-quotation", post(documents::generate_quotation))
        .route("/knowledge/{collection}", post(knowledge::ingest))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.server.allowed_origins))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}

/// A file taken from the `file` field of a multipart form.
struct Upload {
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        return Ok(Upload {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::bad_request("Missing 'file' field in form data."))
}

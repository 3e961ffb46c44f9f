//! Document ingestion into the vector collections.

use crate::AppState;
use crate::error::ApiError;
use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub chunks: usize,
}

/// Splits, embeds and stores a document in `collection`.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    let chunks = state
        .knowledge
        .ingest(
            &collection,
            &request.text,
            request.metadata,
            state.embedder.as_ref(),
        )
        .await?;
    Ok(Json(IngestResponse { chunks }))
}

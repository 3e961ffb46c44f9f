//! Upload endpoints.

use super::read_upload;
use crate::AppState;
use crate::error::ApiError;
use axum::Json;
use axum::extract::{Multipart, State};
use std::sync::Arc;
use switchboard_assistants::{DocumentSummary, Quotation};

/// Summarizes the PDF in the `file` field.
pub async fn summarize(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<DocumentSummary>, ApiError> {
    let upload = read_upload(multipart).await?;
    let summary = state
        .summarizer
        .summarize_pdf(&upload.filename, upload.content_type.as_deref(), upload.bytes)
        .await?;
    Ok(Json(summary))
}

/// Extracts a priced quotation from the image in the `file` field.
pub async fn generate_quotation(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Quotation>, ApiError> {
    let upload = read_upload(multipart).await?;
    let quotation = state
        .quotation
        .extract_quotation(upload.content_type.as_deref(), &upload.bytes)
        .await?;
    Ok(Json(quotation))
}

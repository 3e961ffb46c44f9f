//! Single-request assistant endpoints.

use crate::AppState;
use crate::error::ApiError;
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use switchboard_assistants::{LeadReport, SalesAnswer, SimulationResult, TourismAnswer};

#[derive(Debug, Deserialize)]
pub struct TourismRequest {
    #[serde(default)]
    pub question: String,
}

pub async fn tourism(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TourismRequest>,
) -> Result<Json<TourismAnswer>, ApiError> {
    Ok(Json(state.tourism.ask(&request.question).await?))
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub query: String,
}

pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReportRequest>,
) -> Result<Json<LeadReport>, ApiError> {
    Ok(Json(state.leads.generate_report(&request.query).await?))
}

#[derive(Debug, Deserialize)]
pub struct SalesQueryRequest {
    #[serde(default)]
    pub query: String,
}

pub async fn sales_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SalesQueryRequest>,
) -> Result<Json<SalesAnswer>, ApiError> {
    Ok(Json(state.sales.answer(&request.query).await?))
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub target_language: String,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub translated_text: String,
}

pub async fn translate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let translated_text = state
        .translator
        .translate(&request.text, &request.target_language)
        .await?;
    Ok(Json(TranslateResponse { translated_text }))
}

#[derive(Debug, Deserialize)]
pub struct SimulationRequest {
    #[serde(default)]
    pub policy_text: String,
}

pub async fn run_simulation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SimulationRequest>,
) -> Result<Json<SimulationResult>, ApiError> {
    Ok(Json(state.policy.simulate(&request.policy_text).await?))
}

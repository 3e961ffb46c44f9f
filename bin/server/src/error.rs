//! Server error types.
//!
//! [`ApiError`] turns assistant and knowledge reports into HTTP responses:
//! request problems become 4xx with a specific message, everything else is
//! logged and answered with a generic body. [`StartupError`] covers the
//! failures that keep the server from starting.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rootcause::Report;
use serde_json::json;
use std::fmt;
use switchboard_assistants::AssistantError;
use switchboard_knowledge::KnowledgeError;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Errors returned from request handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request was malformed before reaching an assistant.
    BadRequest(String),
    /// An assistant call failed.
    Assistant(Report<AssistantError>),
    /// Knowledge ingestion failed.
    Knowledge(Report<KnowledgeError>),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl From<Report<AssistantError>> for ApiError {
    fn from(report: Report<AssistantError>) -> Self {
        Self::Assistant(report)
    }
}

impl From<Report<KnowledgeError>> for ApiError {
    fn from(report: Report<KnowledgeError>) -> Self {
        Self::Knowledge(report)
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => error_body(StatusCode::BAD_REQUEST, &message),
            Self::Assistant(report) => match report.current_context() {
                context if context.is_client_error() => {
                    error_body(StatusCode::BAD_REQUEST, &context.to_string())
                }
                context @ AssistantError::Unavailable { .. } => {
                    tracing::warn!(error = %report, "upstream service unavailable");
                    error_body(StatusCode::SERVICE_UNAVAILABLE, &context.to_string())
                }
                _ => {
                    tracing::error!(error = %report, "request failed");
                    error_body(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
                }
            },
            Self::Knowledge(report) => match report.current_context() {
                context @ (KnowledgeError::InvalidCollectionName { .. }
                | KnowledgeError::EmptyDocument) => {
                    error_body(StatusCode::BAD_REQUEST, &context.to_string())
                }
                _ => {
                    tracing::error!(error = %report, "ingestion failed");
                    error_body(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
                }
            },
        }
    }
}

/// Failures while assembling the application.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration could not be loaded.
    Config { reason: String },
    /// The model backend could not be built.
    Backend,
    /// The knowledge directory could not be opened.
    Knowledge,
    /// A demo SQLite database could not be opened.
    Database,
    /// The employee roster could not be loaded.
    Roster,
    /// An assistant graph could not be compiled.
    Graph { assistant: &'static str },
    /// The listener could not be bound.
    Bind { addr: String, reason: String },
    /// The server stopped with an error.
    Serve { reason: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "failed to load configuration: {reason}"),
            Self::Backend => write!(f, "failed to build the model backend"),
            Self::Knowledge => write!(f, "failed to open the knowledge base"),
            Self::Database => write!(f, "failed to open a demo database"),
            Self::Roster => write!(f, "failed to load the employee roster"),
            Self::Graph { assistant } => write!(f, "failed to build the {assistant} graph"),
            Self::Bind { addr, reason } => write!(f, "failed to bind to {addr}: {reason}"),
            Self::Serve { reason } => write!(f, "server error: {reason}"),
        }
    }
}

impl std::error::Error for StartupError {}

//! Conversational endpoints.

use crate::AppState;
use crate::error::ApiError;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use switchboard_assistants::ChatTurn;
use switchboard_conversation::{Message, MessageRole};
use switchboard_core::ThreadId;

const STREAM_ERROR_MESSAGE: &str = "An error occurred while processing your request.";

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
}

/// Streams call-center replies as server-sent events, one per message.
pub async fn call_center(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let replies = state.call_center.stream(&request.query)?;
    let events = replies.map(|reply| {
        Ok(match reply {
            Ok(text) => Event::default().data(text),
            Err(report) => {
                tracing::error!(error = %report, "call center stream failed");
                Event::default().event("error").data(STREAM_ERROR_MESSAGE)
            }
        })
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub thread_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

fn thread_id(raw: String) -> Result<ThreadId, ApiError> {
    ThreadId::new(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}

pub async fn invoke(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InvokeRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let thread_id = thread_id(request.thread_id)?;
    let response = state
        .product_support
        .invoke(&thread_id, &request.message)
        .await?;
    Ok(Json(ChatResponse { response }))
}

/// One turn of a recorded conversation.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub content: String,
}

impl HistoryEntry {
    fn from_message(message: Message) -> Option<Self> {
        let kind = match message.role {
            MessageRole::User => "human",
            MessageRole::Assistant if message.is_visible_reply() => "ai",
            _ => return None,
        };
        Some(Self {
            kind,
            content: message.content,
        })
    }
}

/// The recorded turns of a thread; unknown threads have none.
pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(raw_thread_id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let thread_id = thread_id(raw_thread_id)?;
    let messages = state.product_support.history(&thread_id).await?;
    Ok(Json(
        messages
            .into_iter()
            .filter_map(HistoryEntry::from_message)
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct HrChatRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

pub async fn hr_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HrChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state.hr.chat(&request.prompt, &request.chat_history).await?;
    Ok(Json(ChatResponse { response }))
}

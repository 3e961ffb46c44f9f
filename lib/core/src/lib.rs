//! Core domain types and utilities for switchboard.
//!
//! This crate provides the identifiers and the error-handling foundation
//! shared by every switchboard crate: the LLM layer, the routing graph,
//! the conversation store, and the HTTP server.

pub mod error;
pub mod id;

pub use error::{Result, ValidationError, require_text};
pub use id::{ChunkId, InvocationId, MessageId, ParseIdError, RunId, ThreadId};

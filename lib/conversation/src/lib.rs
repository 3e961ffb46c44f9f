//! Conversation primitives for switchboard.
//!
//! This crate provides:
//!
//! - **Messages**: ordered conversation turns
//! - **Thread Store**: per-thread history keyed by a client-chosen id
//! - **Tool Registry**: tools an agent may call during a turn

pub mod error;
pub mod message;
pub mod thread;
pub mod tool;

pub use error::{ThreadError, ToolError};
pub use message::{Message, MessageRole, to_llm_messages};
pub use thread::{InMemoryThreadStore, Thread, ThreadStore};
pub use tool::{FnTool, Tool, ToolRegistry, parse_args};

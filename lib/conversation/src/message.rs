//! Message types for conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use switchboard_ai::{LlmMessage, ToolCall};
use switchboard_core::MessageId;

pub use switchboard_ai::MessageRole;

/// A message in a conversation.
///
/// Messages are immutable once appended to a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Message role.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
    /// Tools requested by an assistant turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// The call a tool message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Author name: the agent that produced an assistant turn, or the tool
    /// that produced a tool result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Creates a tool result message.
    #[must_use]
    pub fn tool(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(tool_name.into()),
            ..Self::new(MessageRole::Tool, content)
        }
    }

    /// Returns true if this message has tool calls.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Returns true for a user turn.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    /// Returns true for an assistant turn that carries visible text.
    #[must_use]
    pub fn is_visible_reply(&self) -> bool {
        self.role == MessageRole::Assistant && !self.content.is_empty() && !self.has_tool_calls()
    }

    /// Converts to the backend message shape.
    #[must_use]
    pub fn to_llm(&self) -> LlmMessage {
        LlmMessage {
            role: self.role,
            content: self.content.clone(),
            images: Vec::new(),
            tool_calls: self.tool_calls.clone(),
            tool_call_id: self.tool_call_id.clone(),
        }
    }
}

impl From<LlmMessage> for Message {
    fn from(message: LlmMessage) -> Self {
        Self {
            tool_calls: message.tool_calls,
            tool_call_id: message.tool_call_id,
            ..Self::new(message.role, message.content)
        }
    }
}

/// Converts a slice of messages to backend messages, preserving order.
#[must_use]
pub fn to_llm_messages(messages: &[Message]) -> Vec<LlmMessage> {
    messages.iter().map(Message::to_llm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_creation() {
        let msg = Message::user("Hello!");
        assert_eq!(msg.role, MessageRole::User);
        assert!(msg.is_user());
        assert_eq!(msg.content, "Hello!");
    }

    #[test]
    fn tool_call_turns_are_not_visible_replies() {
        let mut msg = Message::assistant("");
        msg.tool_calls.push(ToolCall {
            id: "call_1".to_string(),
            name: "get_price_details".to_string(),
            arguments: serde_json::json!({}),
        });
        assert!(msg.has_tool_calls());
        assert!(!msg.is_visible_reply());
        assert!(Message::assistant("The desk is $800.").is_visible_reply());
    }

    #[test]
    fn llm_conversion_keeps_tool_linkage() {
        let msg = Message::tool("call_7", "get_warranty_policy", "2-year warranty");
        let llm = msg.to_llm();
        assert_eq!(llm.role, MessageRole::Tool);
        assert_eq!(llm.tool_call_id.as_deref(), Some("call_7"));

        let back = Message::from(llm);
        assert_eq!(back.tool_call_id.as_deref(), Some("call_7"));
        assert_eq!(back.content, "2-year warranty");
    }

    #[test]
    fn order_is_preserved_in_conversion() {
        let messages = vec![
            Message::user("a"),
            Message::assistant("b"),
            Message::user("c"),
        ];
        let contents: Vec<_> = to_llm_messages(&messages)
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
    }
}

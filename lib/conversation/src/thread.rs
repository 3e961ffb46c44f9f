//! Conversation threads.
//!
//! A thread is the ordered message history behind one client-chosen
//! `ThreadId`. Threads are created on first contact and live for the
//! lifetime of the store; there is no expiry.

use crate::error::ThreadError;
use crate::message::{Message, MessageRole};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use switchboard_core::ThreadId;
use tokio::sync::RwLock;
use tracing::debug;

/// A conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// Client-supplied identifier.
    pub id: ThreadId,
    /// Messages in append order.
    pub messages: Vec<Message>,
    /// When the thread was created.
    pub created_at: DateTime<Utc>,
    /// When a message was last appended.
    pub last_active_at: DateTime<Utc>,
}

impl Thread {
    /// Creates an empty thread.
    #[must_use]
    pub fn new(id: ThreadId) -> Self {
        let now = Utc::now();
        Self {
            id,
            messages: Vec::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Appends a message.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
        self.last_active_at = Utc::now();
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Returns the last message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Messages with the given role, in order.
    pub fn messages_with_role(&self, role: MessageRole) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.role == role)
    }
}

/// Trait for thread storage.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Returns the thread, creating an empty one if it does not exist.
    async fn get_or_create(&self, id: &ThreadId) -> Result<Thread, Report<ThreadError>>;

    /// Appends messages in order, creating the thread if needed.
    async fn append(
        &self,
        id: &ThreadId,
        messages: Vec<Message>,
    ) -> Result<(), Report<ThreadError>>;

    /// Returns the history, or `None` if the thread was never created.
    async fn history(&self, id: &ThreadId) -> Result<Option<Vec<Message>>, Report<ThreadError>>;
}

/// Process-lifetime thread store.
#[derive(Debug, Default)]
pub struct InMemoryThreadStore {
    threads: RwLock<HashMap<ThreadId, Thread>>,
}

impl InMemoryThreadStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads held.
    pub async fn len(&self) -> usize {
        self.threads.read().await.len()
    }

    /// Whether the store holds no threads.
    pub async fn is_empty(&self) -> bool {
        self.threads.read().await.is_empty()
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    async fn get_or_create(&self, id: &ThreadId) -> Result<Thread, Report<ThreadError>> {
        if let Some(thread) = self.threads.read().await.get(id) {
            return Ok(thread.clone());
        }
        let mut threads = self.threads.write().await;
        let thread = threads.entry(id.clone()).or_insert_with(|| {
            debug!(thread_id = %id, "creating thread");
            Thread::new(id.clone())
        });
        Ok(thread.clone())
    }

    async fn append(
        &self,
        id: &ThreadId,
        messages: Vec<Message>,
    ) -> Result<(), Report<ThreadError>> {
        let mut threads = self.threads.write().await;
        let thread = threads
            .entry(id.clone())
            .or_insert_with(|| Thread::new(id.clone()));
        for message in messages {
            thread.add_message(message);
        }
        debug!(thread_id = %id, messages = thread.message_count(), "thread updated");
        Ok(())
    }

    async fn history(&self, id: &ThreadId) -> Result<Option<Vec<Message>>, Report<ThreadError>> {
        Ok(self
            .threads
            .read()
            .await
            .get(id)
            .map(|thread| thread.messages.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn tid(raw: &str) -> ThreadId {
        ThreadId::new(raw).expect("thread id")
    }

    #[test]
    fn thread_add_message() {
        let mut thread = Thread::new(tid("t1"));
        thread.add_message(Message::user("Hello!"));
        thread.add_message(Message::assistant("Hi there."));

        assert_eq!(thread.message_count(), 2);
        assert_eq!(thread.last_message().map(|m| m.content.as_str()), Some("Hi there."));
        assert_eq!(thread.messages_with_role(MessageRole::User).count(), 1);
    }

    #[tokio::test]
    async fn unknown_thread_has_no_history() {
        let store = InMemoryThreadStore::new();
        assert_eq!(store.history(&tid("nope")).await.expect("history"), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = InMemoryThreadStore::new();
        let first = store.get_or_create(&tid("t1")).await.expect("create");
        let second = store.get_or_create(&tid("t1")).await.expect("get");
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn append_preserves_order_across_calls() {
        let store = InMemoryThreadStore::new();
        let id = tid("t1");
        store
            .append(&id, vec![Message::user("one"), Message::assistant("two")])
            .await
            .expect("append");
        store
            .append(&id, vec![Message::user("three")])
            .await
            .expect("append");

        let history = store.history(&id).await.expect("history").expect("exists");
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn threads_are_isolated_under_concurrency() {
        let store = Arc::new(InMemoryThreadStore::new());
        let mut handles = Vec::new();
        for n in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let id = tid(&format!("t{}", n % 2));
                store
                    .append(&id, vec![Message::user(format!("m{n}"))])
                    .await
                    .expect("append");
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }

        let even = store.history(&tid("t0")).await.expect("history").expect("exists");
        let odd = store.history(&tid("t1")).await.expect("history").expect("exists");
        assert_eq!(even.len(), 4);
        assert_eq!(odd.len(), 4);
    }
}

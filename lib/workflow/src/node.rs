//! Graph nodes.

use crate::error::NodeError;
use crate::state::GraphState;
use async_trait::async_trait;
use rootcause::prelude::Report;
use std::future::Future;
use std::marker::PhantomData;

/// One step of a graph: reads the state and returns an update for it.
#[async_trait]
pub trait Node<S: GraphState>: Send + Sync {
    /// Runs the step.
    async fn run(&self, state: &S) -> Result<S::Update, Report<NodeError>>;
}

/// Adapts an async closure taking an owned state snapshot into a [`Node`].
pub struct FnNode<S, F> {
    func: F,
    _state: PhantomData<fn(S)>,
}

/// Wraps `func` as a node.
///
/// The closure receives a clone of the current state, which keeps borrowed
/// state out of the returned future.
#[must_use]
pub fn node_fn<S, F, Fut>(func: F) -> FnNode<S, F>
where
    S: GraphState,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = Result<S::Update, Report<NodeError>>> + Send,
{
    FnNode {
        func,
        _state: PhantomData,
    }
}

#[async_trait]
impl<S, F, Fut> Node<S> for FnNode<S, F>
where
    S: GraphState,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = Result<S::Update, Report<NodeError>>> + Send,
{
    async fn run(&self, state: &S) -> Result<S::Update, Report<NodeError>> {
        (self.func)(state.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state::{Trail, TrailUpdate};

    #[tokio::test]
    async fn closure_node_sees_state() {
        let node = node_fn(|state: Trail| async move {
            Ok(TrailUpdate::say(&format!("seen {}", state.messages.len())))
        });
        let state = Trail {
            messages: vec!["a".to_string(), "b".to_string()],
            next: String::new(),
        };
        let update = node.run(&state).await.expect("run");
        assert_eq!(update, TrailUpdate::say("seen 2"));
    }

    #[tokio::test]
    async fn closure_node_propagates_errors() {
        let node = node_fn(|_: Trail| async move {
            Err::<TrailUpdate, _>(Report::from(NodeError::Failed {
                reason: "backend down".to_string(),
            }))
        });
        let err = node.run(&Trail::default()).await.unwrap_err();
        assert_eq!(
            err.current_context(),
            &NodeError::Failed {
                reason: "backend down".to_string()
            }
        );
    }
}

//! Routing graphs for switchboard assistants.
//!
//! A [`StateGraph`] is built from named nodes that each produce an update to
//! a shared [`GraphState`], joined by direct edges or by conditional edges
//! whose router picks a label that is looked up in a path map. Compiling the
//! graph validates its shape; the resulting [`CompiledGraph`] can be run to
//! completion with [`CompiledGraph::invoke`] or step by step with
//! [`CompiledGraph::stream`].

pub mod error;
pub mod execution;
pub mod graph;
pub mod node;
pub mod state;

pub use error::{ExecutionError, GraphError, NodeError};
pub use execution::{GraphEvent, RunOutcome, RunRecord, StepEvent, Termination};
pub use graph::{CompiledGraph, DEFAULT_RECURSION_LIMIT, END, START, StateGraph};
pub use node::{FnNode, Node, node_fn};
pub use state::GraphState;

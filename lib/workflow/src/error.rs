//! Error types for the workflow crate.
//!
//! - `GraphError`: problems with the shape of a graph, found while building
//!   or compiling it.
//! - `NodeError`: failures inside a node; callers attach it as context to
//!   the underlying report.
//! - `ExecutionError`: failures of a run, wrapping node failures via context.

use std::fmt;

/// Errors from building or compiling a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A node with this name was already added.
    DuplicateNode { name: String },
    /// The name is reserved for the virtual start or end node.
    ReservedName { name: String },
    /// The node already has an outgoing edge specification.
    DuplicateEdge { from: String },
    /// An edge or entry point refers to a node that does not exist.
    UnknownNode { name: String },
    /// An edge leads to a node that does not exist.
    UnknownTarget { from: String, to: String },
    /// No entry point was set.
    MissingEntryPoint,
    /// The node has no outgoing edge specification.
    NoOutgoingEdge { node: String },
    /// The node cannot be reached from the entry point.
    Unreachable { node: String },
    /// No path leads from the entry point to the end.
    NoPathToEnd,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode { name } => write!(f, "node '{name}' already exists"),
            Self::ReservedName { name } => write!(f, "node name '{name}' is reserved"),
            Self::DuplicateEdge { from } => {
                write!(f, "node '{from}' already has an outgoing edge")
            }
            Self::UnknownNode { name } => write!(f, "unknown node: {name}"),
            Self::UnknownTarget { from, to } => {
                write!(f, "edge from '{from}' leads to unknown node '{to}'")
            }
            Self::MissingEntryPoint => write!(f, "graph has no entry point"),
            Self::NoOutgoingEdge { node } => write!(f, "node '{node}' has no outgoing edge"),
            Self::Unreachable { node } => {
                write!(f, "node '{node}' is unreachable from the entry point")
            }
            Self::NoPathToEnd => write!(f, "no path from the entry point reaches the end"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Errors raised by node implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// The node could not produce an update.
    Failed { reason: String },
    /// A step the node depends on failed; the cause is the attached report.
    Step { operation: &'static str },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "node failed: {reason}"),
            Self::Step { operation } => write!(f, "{operation} failed"),
        }
    }
}

impl std::error::Error for NodeError {}

/// Errors from running a compiled graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The run executed more nodes than the recursion limit allows.
    RecursionLimit { limit: u32 },
    /// A node returned an error.
    NodeFailed { node: String },
    /// The consumer of a streamed run went away.
    Cancelled,
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecursionLimit { limit } => {
                write!(f, "recursion limit of {limit} steps reached")
            }
            Self::NodeFailed { node } => write!(f, "node '{node}' failed"),
            Self::Cancelled => write!(f, "run cancelled"),
        }
    }
}

impl std::error::Error for ExecutionError {}

//! Graph construction and validation.
//!
//! Nodes are identified by name. Every node has exactly one outgoing edge
//! specification: either a direct edge to one target, or a conditional edge
//! whose router returns a label that the path map turns into a target. The
//! virtual [`END`] target finishes a run.
//!
//! Compilation copies the shape into a petgraph `DiGraph` to check that
//! every node is reachable from the entry point and that the end can be
//! reached at all.

use crate::error::GraphError;
use crate::node::Node;
use crate::state::GraphState;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use rootcause::prelude::Report;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Virtual start node. `add_edge(START, name)` sets the entry point.
pub const START: &str = "__start__";

/// Virtual end node.
pub const END: &str = "__end__";

/// Node executions allowed per run unless overridden.
pub const DEFAULT_RECURSION_LIMIT: u32 = 25;

pub(crate) type Router<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

pub(crate) enum EdgeSpec<S> {
    Direct(String),
    Conditional {
        router: Router<S>,
        path_map: HashMap<String, String>,
    },
}

impl<S> EdgeSpec<S> {
    fn targets(&self) -> Vec<&str> {
        match self {
            Self::Direct(target) => vec![target.as_str()],
            Self::Conditional { path_map, .. } => {
                let mut targets: Vec<&str> = path_map.values().map(String::as_str).collect();
                targets.sort_unstable();
                targets.dedup();
                targets
            }
        }
    }
}

fn is_reserved(name: &str) -> bool {
    name == START || name == END || name.trim().is_empty()
}

/// Builder for a routing graph over state `S`.
pub struct StateGraph<S: GraphState> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    order: Vec<String>,
    edges: HashMap<String, EdgeSpec<S>>,
    entry: Option<String>,
}

impl<S: GraphState> Default for StateGraph<S> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: HashMap::new(),
            entry: None,
        }
    }
}

impl<S: GraphState> StateGraph<S> {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named node.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::ReservedName` for blank names and the virtual
    /// start/end names, or `GraphError::DuplicateNode`.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        node: impl Node<S> + 'static,
    ) -> Result<(), Report<GraphError>> {
        let name = name.into();
        if is_reserved(&name) {
            return Err(GraphError::ReservedName { name }.into());
        }
        if self.nodes.contains_key(&name) {
            return Err(GraphError::DuplicateNode { name }.into());
        }
        self.nodes.insert(name.clone(), Arc::new(node));
        self.order.push(name);
        Ok(())
    }

    /// Sets the node a run starts at.
    pub fn set_entry_point(&mut self, name: impl Into<String>) {
        self.entry = Some(name.into());
    }

    /// Adds a direct edge. An edge from [`START`] sets the entry point.
    ///
    /// Targets are checked when the graph is compiled.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::ReservedName` for edges leaving [`END`], or
    /// `GraphError::DuplicateEdge` if `from` already has an edge.
    pub fn add_edge(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<(), Report<GraphError>> {
        let from = from.into();
        let to = to.into();
        if from == START {
            self.set_entry_point(to);
            return Ok(());
        }
        self.insert_edge(from, EdgeSpec::Direct(to))
    }

    /// Adds a conditional edge: after `from` runs, `router` picks a label
    /// and `path_map` names the next node for it.
    ///
    /// # Errors
    ///
    /// Same as [`StateGraph::add_edge`].
    pub fn add_conditional_edges<F, I, K, V>(
        &mut self,
        from: impl Into<String>,
        router: F,
        path_map: I,
    ) -> Result<(), Report<GraphError>>
    where
        F: Fn(&S) -> String + Send + Sync + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let path_map = path_map
            .into_iter()
            .map(|(label, target)| (label.into(), target.into()))
            .collect();
        self.insert_edge(
            from.into(),
            EdgeSpec::Conditional {
                router: Arc::new(router),
                path_map,
            },
        )
    }

    fn insert_edge(&mut self, from: String, spec: EdgeSpec<S>) -> Result<(), Report<GraphError>> {
        if from == END || from == START {
            return Err(GraphError::ReservedName { name: from }.into());
        }
        if self.edges.contains_key(&from) {
            return Err(GraphError::DuplicateEdge { from }.into());
        }
        self.edges.insert(from, spec);
        Ok(())
    }

    /// Validates the graph and freezes it for execution.
    ///
    /// # Errors
    ///
    /// Returns the first `GraphError` found: a missing or unknown entry
    /// point, an edge from or to an unknown node, a node without an
    /// outgoing edge, an unreachable node, or no route to the end.
    pub fn compile(self) -> Result<CompiledGraph<S>, Report<GraphError>> {
        let entry = self.entry.ok_or(GraphError::MissingEntryPoint)?;
        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::UnknownNode { name: entry }.into());
        }

        let mut sources: Vec<&String> = self.edges.keys().collect();
        sources.sort();
        for from in sources {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::UnknownNode { name: from.clone() }.into());
            }
        }

        let mut graph = DiGraph::<String, ()>::new();
        let mut index: HashMap<String, NodeIndex> = HashMap::new();
        for name in self.order.iter().map(String::as_str).chain([END]) {
            index.insert(name.to_string(), graph.add_node(name.to_string()));
        }

        for name in &self.order {
            let Some(spec) = self.edges.get(name) else {
                return Err(GraphError::NoOutgoingEdge { node: name.clone() }.into());
            };
            for target in spec.targets() {
                let (Some(&a), Some(&b)) = (index.get(name), index.get(target)) else {
                    return Err(GraphError::UnknownTarget {
                        from: name.clone(),
                        to: target.to_string(),
                    }
                    .into());
                };
                graph.update_edge(a, b, ());
            }
        }

        let mut reached = HashSet::new();
        if let Some(&start) = index.get(&entry) {
            let mut bfs = Bfs::new(&graph, start);
            while let Some(ix) = bfs.next(&graph) {
                reached.insert(ix);
            }
        }
        for name in &self.order {
            if index.get(name).is_none_or(|ix| !reached.contains(ix)) {
                return Err(GraphError::Unreachable { node: name.clone() }.into());
            }
        }
        if index.get(END).is_none_or(|ix| !reached.contains(ix)) {
            return Err(GraphError::NoPathToEnd.into());
        }

        Ok(CompiledGraph {
            inner: Arc::new(GraphInner {
                nodes: self.nodes,
                edges: self.edges,
                entry,
                graph,
                index,
            }),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        })
    }
}

pub(crate) struct GraphInner<S: GraphState> {
    pub(crate) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(crate) edges: HashMap<String, EdgeSpec<S>>,
    pub(crate) entry: String,
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

/// A validated graph, cheap to clone and share between requests.
pub struct CompiledGraph<S: GraphState> {
    pub(crate) inner: Arc<GraphInner<S>>,
    pub(crate) recursion_limit: u32,
}

impl<S: GraphState> Clone for CompiledGraph<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            recursion_limit: self.recursion_limit,
        }
    }
}

impl<S: GraphState> CompiledGraph<S> {
    /// Sets how many node executions one run may perform.
    #[must_use]
    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// The configured recursion limit.
    #[must_use]
    pub fn recursion_limit(&self) -> u32 {
        self.recursion_limit
    }

    /// The entry node.
    #[must_use]
    pub fn entry(&self) -> &str {
        &self.inner.entry
    }

    /// Possible next nodes after `name`, sorted. [`END`] is included when
    /// the node can finish the run.
    #[must_use]
    pub fn successors(&self, name: &str) -> Vec<&str> {
        let Some(&ix) = self.inner.index.get(name) else {
            return Vec::new();
        };
        let mut next: Vec<&str> = self
            .inner
            .graph
            .neighbors_directed(ix, Direction::Outgoing)
            .map(|n| self.inner.graph[n].as_str())
            .collect();
        next.sort_unstable();
        next
    }
}

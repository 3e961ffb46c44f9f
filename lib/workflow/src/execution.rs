//! Running compiled graphs.
//!
//! A run starts at the entry node and repeatedly executes the current node,
//! folds its update into the state, and follows the node's edge. It ends when
//! the edge leads to [`END`], when a router returns a label the path map does
//! not know, or with an error when a node fails or the recursion limit is hit.

use crate::error::ExecutionError;
use crate::graph::{CompiledGraph, END, EdgeSpec};
use crate::state::GraphState;
use chrono::{DateTime, Utc};
use rootcause::prelude::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use switchboard_core::RunId;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, instrument, warn};

const STREAM_BUFFER: usize = 16;

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// An edge led to the end node.
    Finished,
    /// A router produced a label with no entry in the path map.
    UnknownLabel { node: String, label: String },
}

/// Summary of one completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique identifier for this run.
    pub run_id: RunId,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run stopped.
    pub finished_at: DateTime<Utc>,
    /// Executed nodes in order, repeats included.
    pub visited: Vec<String>,
    /// How the run stopped.
    pub termination: Termination,
}

impl RunRecord {
    /// Number of node executions.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.visited.len()
    }

    /// Returns true if the run reached the end node.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.termination == Termination::Finished
    }
}

/// Final state and record of a run.
#[derive(Debug, Clone)]
pub struct RunOutcome<S> {
    pub state: S,
    pub record: RunRecord,
}

/// The update produced by one node execution.
#[derive(Debug, Clone, PartialEq)]
pub struct StepEvent<U> {
    /// 1-based execution counter.
    pub step: u32,
    pub node: String,
    pub update: U,
}

/// Item of a streamed run.
pub enum GraphEvent<S: GraphState> {
    Step(StepEvent<S::Update>),
    /// Always the last item of a successful run.
    Completed(RunOutcome<S>),
    /// Always the last item of a failed run.
    Failed(Report<ExecutionError>),
}

impl<S: GraphState> CompiledGraph<S> {
    /// Runs the graph to completion.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::NodeFailed` (with the node's report as cause)
    /// or `ExecutionError::RecursionLimit`.
    pub async fn invoke(&self, state: S) -> Result<RunOutcome<S>, Report<ExecutionError>> {
        self.execute(state, None).await
    }

    /// Runs the graph on a background task, yielding each step as it
    /// completes followed by one `Completed` or `Failed` event.
    ///
    /// Dropping the stream stops the run before its next node.
    #[must_use]
    pub fn stream(&self, state: S) -> ReceiverStream<GraphEvent<S>> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let graph = self.clone();
        tokio::spawn(async move {
            let last = match graph.execute(state, Some(&tx)).await {
                Ok(outcome) => GraphEvent::Completed(outcome),
                Err(report) => GraphEvent::Failed(report),
            };
            if tx.send(last).await.is_err() {
                debug!("graph stream closed before completion");
            }
        });
        ReceiverStream::new(rx)
    }

    #[instrument(skip(self, state, events), fields(entry = %self.inner.entry, limit = self.recursion_limit))]
    async fn execute(
        &self,
        mut state: S,
        events: Option<&mpsc::Sender<GraphEvent<S>>>,
    ) -> Result<RunOutcome<S>, Report<ExecutionError>> {
        let run_id = RunId::new();
        let started_at = Utc::now();
        let mut visited: Vec<String> = Vec::new();
        let mut current = self.inner.entry.clone();
        let mut step: u32 = 0;

        let termination = loop {
            if step >= self.recursion_limit {
                warn!(%run_id, node = %current, "recursion limit reached");
                return Err(ExecutionError::RecursionLimit {
                    limit: self.recursion_limit,
                }
                .into());
            }
            step += 1;

            let Some(node) = self.inner.nodes.get(&current) else {
                return Err(ExecutionError::NodeFailed { node: current }.into());
            };
            debug!(step, node = %current, "running node");
            let update = node
                .run(&state)
                .await
                .context(ExecutionError::NodeFailed {
                    node: current.clone(),
                })?;
            state.apply(update.clone());
            visited.push(current.clone());

            if let Some(tx) = events {
                let event = GraphEvent::Step(StepEvent {
                    step,
                    node: current.clone(),
                    update,
                });
                if tx.send(event).await.is_err() {
                    info!(%run_id, steps = step, "stream receiver dropped, stopping run");
                    return Err(ExecutionError::Cancelled.into());
                }
            }

            let next = match self.inner.edges.get(&current) {
                Some(EdgeSpec::Direct(target)) => target.clone(),
                Some(EdgeSpec::Conditional { router, path_map }) => {
                    let label = router(&state);
                    match path_map.get(&label) {
                        Some(target) => target.clone(),
                        None => {
                            warn!(node = %current, %label, "routing label not in path map, stopping run");
                            break Termination::UnknownLabel {
                                node: current,
                                label,
                            };
                        }
                    }
                }
                None => break Termination::Finished,
            };
            if next == END {
                break Termination::Finished;
            }
            current = next;
        };

        info!(%run_id, steps = visited.len(), ?termination, "run complete");
        Ok(RunOutcome {
            state,
            record: RunRecord {
                run_id,
                started_at,
                finished_at: Utc::now(),
                visited,
                termination,
            },
        })
    }
}

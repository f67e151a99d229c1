//! Dependency-driven execution of a [`CompiledGraph`].
//!
//! A node becomes ready once every predecessor on a *taken* edge has
//! completed; router dispatch resolves, at runtime, which of a node's
//! labelled edges is taken. Nodes on an edge that is never taken are
//! pruned without running, and the pruning cascades through their own
//! outgoing edges so a skipped branch never blocks its join target.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinSet;

use nebula_action::{Action, ActionContext};
use nebula_core::NodeId;
use nebula_error::{NebulaError, Result};
use nebula_execution::{PartialStateUpdate, SharedExecutionState};

use crate::compile::CompiledGraph;

enum Outcome {
    Taken(NodeId),
    NotTaken(NodeId),
}

/// Runs one invocation of a compiled workflow against a fresh execution
/// state.
pub struct Scheduler {
    graph: CompiledGraph,
    actions: HashMap<NodeId, Arc<dyn Action>>,
    ctx: Arc<ActionContext>,
}

impl Scheduler {
    pub fn new(graph: CompiledGraph, actions: HashMap<NodeId, Arc<dyn Action>>, ctx: Arc<ActionContext>) -> Self {
        Self { graph, actions, ctx }
    }

    /// Executes the graph against `input`, returning the value `end`
    /// projected, or the first fatal error.
    pub async fn run(&self, input: Value) -> Result<Value> {
        let state = SharedExecutionState::new(input);

        let mut remaining: HashMap<NodeId, usize> = self
            .graph
            .node_ids()
            .map(|id| (id.clone(), self.graph.node(id).unwrap().in_degree))
            .collect();
        let mut reached: HashSet<NodeId> = HashSet::new();
        let mut scheduled: HashSet<NodeId> = HashSet::new();
        let mut join_set: JoinSet<(NodeId, PartialStateUpdate)> = JoinSet::new();

        reached.insert(NodeId::start());
        scheduled.insert(NodeId::start());
        self.try_schedule(NodeId::start(), &state, &mut join_set);

        let mut aborted: Option<NebulaError> = None;

        while let Some(joined) = join_set.join_next().await {
            let (node_id, update) = joined.expect("node task panicked");

            let fatal = if self.graph.fail_fast && !update.errors.is_empty() {
                update.errors.first().cloned()
            } else {
                None
            };

            state.apply(update);

            if let Some(first_error) = fatal {
                tracing::warn!(
                    workflow_id = %self.graph.workflow_id,
                    %node_id,
                    reason = %first_error.message,
                    "aborting run after node error (fail_fast)"
                );
                aborted = Some(NebulaError::ExecutionAborted {
                    node_id: node_id.to_string(),
                    reason: first_error.message,
                });
                join_set.shutdown().await;
                break;
            }

            if node_id != NodeId::end() {
                self.fire(&node_id, &state, &mut remaining, &mut reached, &mut scheduled, &mut join_set);
            }
        }

        if let Some(err) = aborted {
            return Err(err);
        }

        let snapshot = state.snapshot();
        snapshot.output.ok_or_else(|| NebulaError::ExecutionAborted {
            node_id: self.graph.workflow_id.clone(),
            reason: "workflow completed without the 'end' node producing output".to_string(),
        })
    }

    /// Resolves `node_id`'s outgoing dispatch into a worklist of taken/
    /// not-taken outcomes and drains it, pruning and scheduling as each
    /// outcome is processed.
    fn fire(
        &self,
        node_id: &NodeId,
        state: &SharedExecutionState,
        remaining: &mut HashMap<NodeId, usize>,
        reached: &mut HashSet<NodeId>,
        scheduled: &mut HashSet<NodeId>,
        join_set: &mut JoinSet<(NodeId, PartialStateUpdate)>,
    ) {
        let mut worklist: Vec<Outcome> = self.dispatch_outcomes(node_id, state);

        while let Some(outcome) = worklist.pop() {
            match outcome {
                Outcome::Taken(target) => {
                    reached.insert(target.clone());
                    if self.settle(&target, remaining) && scheduled.insert(target.clone()) {
                        self.try_schedule(target, state, join_set);
                    }
                }
                Outcome::NotTaken(target) => {
                    if self.settle(&target, remaining) {
                        if reached.contains(&target) {
                            if scheduled.insert(target.clone()) {
                                self.try_schedule(target, state, join_set);
                            }
                        } else {
                            worklist.extend(self.dispatch_outcomes(&target, state).into_iter().map(|o| match o {
                                Outcome::Taken(t) | Outcome::NotTaken(t) => Outcome::NotTaken(t),
                            }));
                        }
                    }
                }
            }
        }
    }

    /// The edges a node's completion resolves: every unconditional
    /// successor is taken; for a conditional dispatch, the entry matching
    /// the label the node wrote (or `"else"`) is taken and every other
    /// entry is not.
    fn dispatch_outcomes(&self, node_id: &NodeId, state: &SharedExecutionState) -> Vec<Outcome> {
        let Some(compiled) = self.graph.node(node_id) else {
            return Vec::new();
        };

        let mut outcomes: Vec<Outcome> = compiled
            .unconditional
            .iter()
            .cloned()
            .map(Outcome::Taken)
            .collect();

        if let Some(cases) = &compiled.conditional {
            let label = state
                .snapshot()
                .node_output(node_id.as_str())
                .and_then(|v| v.get("label").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "else".to_string());
            let chosen_key = if cases.contains_key(&label) { label } else { "else".to_string() };

            for (key, target) in cases {
                if *key == chosen_key {
                    outcomes.push(Outcome::Taken(target.clone()));
                } else {
                    outcomes.push(Outcome::NotTaken(target.clone()));
                }
            }
        }

        outcomes
    }

    /// Decrements `target`'s remaining predecessor count, returning whether
    /// it just reached zero.
    fn settle(&self, target: &NodeId, remaining: &mut HashMap<NodeId, usize>) -> bool {
        let count = remaining.get_mut(target).expect("compiled graph references an unknown node");
        *count -= 1;
        *count == 0
    }

    fn try_schedule(
        &self,
        node_id: NodeId,
        state: &SharedExecutionState,
        join_set: &mut JoinSet<(NodeId, PartialStateUpdate)>,
    ) {
        let action = self
            .actions
            .get(&node_id)
            .cloned()
            .unwrap_or_else(|| panic!("no action registered for node '{node_id}'"));
        let ctx = Arc::clone(&self.ctx);
        let snapshot = state.as_value();

        join_set.spawn(async move {
            let update = action.execute(&snapshot, &ctx).await;
            (node_id, update)
        });
    }
}

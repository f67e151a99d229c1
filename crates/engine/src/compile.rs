//! Compiles a validated [`Workflow`] into a [`CompiledGraph`]: a static,
//! reusable dispatch table the scheduler walks once per invocation.

use std::collections::HashMap;

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use nebula_core::NodeId;
use nebula_error::{NebulaError, Result};
use nebula_workflow::{Edge, Workflow};

/// A single node's outgoing dispatch, resolved at compile time from its
/// declared edges.
///
/// `unconditional` successors always fire when the node completes.
/// `conditional`, when present, picks exactly one target at runtime from the
/// label the node wrote to `data[node_id]["label"]` — only router nodes
/// populate this, but the scheduler treats it as a generic dispatch.
#[derive(Debug, Clone, Default)]
pub struct CompiledNode {
    pub unconditional: Vec<NodeId>,
    pub conditional: Option<IndexMap<String, NodeId>>,
    pub in_degree: usize,
}

/// A workflow compiled into a runnable dispatch graph, reusable across many
/// invocations.
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    pub workflow_id: String,
    pub fail_fast: bool,
    pub(crate) nodes: HashMap<NodeId, CompiledNode>,
}

impl CompiledGraph {
    pub fn node(&self, id: &NodeId) -> Option<&CompiledNode> {
        self.nodes.get(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }
}

fn reserved_check(workflow: &Workflow) -> Result<()> {
    for node in &workflow.nodes {
        if node.id().is_reserved() {
            return Err(NebulaError::ReservedIdUsed {
                node_id: node.id().to_string(),
            });
        }
    }
    Ok(())
}

fn reaches_end(edge: &Edge) -> bool {
    match edge {
        Edge::Simple(e) => e.to == "end",
        Edge::Branch(e) => e.routes.iter().any(|r| r.to == "end"),
    }
}

/// Flattened `(from, to, when_label)` edges: [`nebula_workflow::BranchEdge`]
/// routes are expanded into one entry per route, mirroring
/// `_add_edges`'s `by_from` grouping.
struct FlatEdge {
    from: String,
    to: String,
    when_label: Option<String>,
}

fn ensure_node(
    graph: &mut DiGraph<NodeId, Option<String>>,
    index_of: &mut HashMap<NodeId, NodeIndex>,
    id: &str,
) -> NodeIndex {
    let node_id = NodeId::new(id);
    *index_of
        .entry(node_id.clone())
        .or_insert_with(|| graph.add_node(node_id))
}

fn flatten_edges(workflow: &Workflow) -> Vec<FlatEdge> {
    let mut flat = Vec::new();
    for edge in &workflow.edges {
        match edge {
            Edge::Simple(e) => flat.push(FlatEdge {
                from: e.from.clone(),
                to: e.to.clone(),
                when_label: e.when_label.clone(),
            }),
            Edge::Branch(e) => {
                for route in &e.routes {
                    flat.push(FlatEdge {
                        from: e.from.clone(),
                        to: route.to.clone(),
                        when_label: route.when_label.clone(),
                    });
                }
            }
        }
    }
    flat
}

/// Compiles a workflow into a [`CompiledGraph`].
///
/// Mirrors `WorkflowCompiler.compile`: runs the semantic checks that depend
/// on the synthetic `start`/`end` nodes, then groups edges by source,
/// flattening branch routes and installing the `else -> end` fallback for
/// any source with at least one labelled edge.
pub fn compile(workflow: &Workflow) -> Result<CompiledGraph> {
    reserved_check(workflow)?;

    if !workflow.edges.iter().any(|e| e.from() == "start") {
        return Err(NebulaError::NoStartEdge {
            workflow_id: workflow.id.clone(),
        });
    }
    if !workflow.edges.iter().any(reaches_end) {
        return Err(NebulaError::NoEndEdge {
            workflow_id: workflow.id.clone(),
        });
    }

    let mut flat = flatten_edges(workflow);

    // Group labelled edges by source so we can install the `else -> end`
    // fallback once per router-like source, as a real edge that takes part
    // in `end`'s join accounting.
    let mut labelled_sources: Vec<String> = Vec::new();
    for edge in &flat {
        if edge.when_label.is_some() && !labelled_sources.contains(&edge.from) {
            labelled_sources.push(edge.from.clone());
        }
    }
    for src in &labelled_sources {
        let has_else = flat
            .iter()
            .any(|e| e.from == *src && e.when_label.as_deref() == Some("else"));
        if !has_else {
            flat.push(FlatEdge {
                from: src.clone(),
                to: "end".to_string(),
                when_label: Some("else".to_string()),
            });
        }
    }

    let mut graph: DiGraph<NodeId, Option<String>> = DiGraph::new();
    let mut index_of: HashMap<NodeId, NodeIndex> = HashMap::new();

    ensure_node(&mut graph, &mut index_of, "start");
    ensure_node(&mut graph, &mut index_of, "end");
    for node in &workflow.nodes {
        ensure_node(&mut graph, &mut index_of, node.id().as_str());
    }

    for edge in &flat {
        let from_idx = ensure_node(&mut graph, &mut index_of, &edge.from);
        let to_idx = ensure_node(&mut graph, &mut index_of, &edge.to);
        graph.add_edge(from_idx, to_idx, edge.when_label.clone());
    }

    if petgraph::algo::toposort(&graph, None).is_err() {
        return Err(NebulaError::InvalidWorkflow {
            reason: format!("workflow '{}' contains a cycle", workflow.id),
        });
    }

    let mut nodes: HashMap<NodeId, CompiledNode> = HashMap::with_capacity(index_of.len());
    for (node_id, &idx) in &index_of {
        let in_degree = graph.edges_directed(idx, Direction::Incoming).count();

        let mut unconditional = Vec::new();
        let mut conditional: IndexMap<String, NodeId> = IndexMap::new();
        for edge_ref in graph.edges_directed(idx, Direction::Outgoing) {
            let target = graph[edge_ref.target()].clone();
            match edge_ref.weight() {
                None => unconditional.push(target),
                Some(label) => {
                    conditional.insert(label.clone(), target);
                }
            }
        }

        nodes.insert(
            node_id.clone(),
            CompiledNode {
                unconditional,
                conditional: if conditional.is_empty() {
                    None
                } else {
                    Some(conditional)
                },
                in_degree,
            },
        );
    }

    tracing::debug!(
        workflow_id = %workflow.id,
        nodes = nodes.len(),
        "compiled workflow graph"
    );

    Ok(CompiledGraph {
        workflow_id: workflow.id.clone(),
        fail_fast: workflow.fail_fast,
        nodes,
    })
}

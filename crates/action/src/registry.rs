use std::collections::HashMap;
use std::sync::Arc;

use nebula_core::NodeId;
use nebula_error::{NebulaError, Result};
use nebula_workflow::{Node, Workflow};

use crate::nodes::{EndAction, HttpRequestAction, JqTransformAction, LlmAction, NoopAction, PythonCodeAction, RouterAction, StartAction};
use crate::Action;

/// Builds the `NodeId -> Action` table for a compiled workflow: one authored
/// action per declared node, plus the two system actions the compiler
/// installs for every graph.
pub fn build_actions(workflow: &Workflow) -> Result<HashMap<NodeId, Arc<dyn Action>>> {
    let mut actions: HashMap<NodeId, Arc<dyn Action>> = HashMap::with_capacity(workflow.nodes.len() + 2);

    for node in &workflow.nodes {
        let action: Arc<dyn Action> = match node {
            Node::Noop(n) => Arc::new(NoopAction::new(n)),
            Node::JqTransform(n) => Arc::new(JqTransformAction::new(n)),
            Node::PythonCode(n) => Arc::new(PythonCodeAction::new(n)),
            Node::Llm(n) => Arc::new(LlmAction::new(n)),
            Node::Router(n) => Arc::new(RouterAction::new(n)),
            Node::HttpRequest(n) => Arc::new(HttpRequestAction::new(n)),
        };
        if actions.insert(node.id().clone(), action).is_some() {
            return Err(NebulaError::InvalidWorkflow {
                reason: format!("duplicate node id: {}", node.id()),
            });
        }
    }

    actions.insert(NodeId::start(), Arc::new(StartAction::new()));
    actions.insert(
        NodeId::end(),
        Arc::new(EndAction::new(workflow.output.input_mapping.clone())),
    );

    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workflow() -> Workflow {
        nebula_workflow::from_json(
            &json!({
                "id": "wf",
                "version": 1,
                "input": {"schema": "object"},
                "output": {"input_mapping": {}},
                "nodes": [
                    {"kind": "noop", "id": "passthrough", "input_mapping": {}, "output_mapping": {}}
                ],
                "edges": [
                    {"from": "start", "to": "passthrough"},
                    {"from": "passthrough", "to": "end"}
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn builds_one_action_per_node_plus_system_nodes() {
        let actions = build_actions(&workflow()).unwrap();
        assert!(actions.contains_key(&NodeId::new("passthrough")));
        assert!(actions.contains_key(&NodeId::start()));
        assert!(actions.contains_key(&NodeId::end()));
    }
}

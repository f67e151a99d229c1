//! Structural validation of a parsed [`Workflow`].

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use nebula_error::{NebulaError, Result};

use crate::model::{Edge, Workflow};

fn node_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("static pattern is valid"))
}

fn invalid(reason: impl Into<String>) -> NebulaError {
    NebulaError::InvalidWorkflow {
        reason: reason.into(),
    }
}

/// Runs every `C1` structural check against an already-deserialised
/// workflow: well-formed and unique node ids, no reserved ids among
/// declared nodes, non-empty branch routes, and edges that only reference
/// declared or reserved (`start`/`end`) node ids.
///
/// Semantic checks that depend on the compiler's synthetic system nodes —
/// "at least one edge from start", "at least one edge to end" — are left to
/// `nebula-engine`, which runs them once it has installed those nodes.
pub fn validate(workflow: &Workflow) -> Result<()> {
    let pattern = node_id_pattern();
    let mut seen = HashSet::with_capacity(workflow.nodes.len());

    for node in &workflow.nodes {
        let id = node.id().as_str();

        if !pattern.is_match(id) {
            return Err(invalid(format!(
                "node id '{id}' must be lowercase snake_case (e.g. 'node_name')"
            )));
        }
        if id == "start" || id == "end" {
            return Err(invalid(format!(
                "node id '{id}' is reserved and cannot be declared"
            )));
        }
        if !seen.insert(id) {
            return Err(invalid(format!("duplicate node id '{id}'")));
        }
    }

    let mut node_ids: HashSet<&str> = seen;
    node_ids.insert("start");
    node_ids.insert("end");

    for edge in &workflow.edges {
        let from = edge.from();
        if !node_ids.contains(from) {
            return Err(invalid(format!("edge from unknown node '{from}'")));
        }

        match edge {
            Edge::Simple(e) => {
                if e.to != "end" && !node_ids.contains(e.to.as_str()) {
                    return Err(invalid(format!("edge to unknown node '{}'", e.to)));
                }
            }
            Edge::Branch(e) => {
                if e.routes.is_empty() {
                    return Err(invalid(format!(
                        "branch edge from '{from}' must have at least one route"
                    )));
                }
                for route in &e.routes {
                    if route.to != "end" && !node_ids.contains(route.to.as_str()) {
                        return Err(invalid(format!(
                            "edge route to unknown node '{}'",
                            route.to
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::from_json;

    fn wf(nodes: &str, edges: &str) -> String {
        format!(
            r#"{{
                "id": "wf1",
                "version": 1,
                "input": {{}},
                "output": {{"input_mapping": {{}}}},
                "nodes": [{nodes}],
                "edges": [{edges}]
            }}"#
        )
    }

    #[test]
    fn rejects_malformed_node_id() {
        let src = wf(r#"{"id":"Bad-Id","kind":"noop"}"#, "");
        let err = from_json(&src).unwrap_err();
        assert!(err.to_string().contains("snake_case"));
    }

    #[test]
    fn rejects_reserved_node_id() {
        let src = wf(r#"{"id":"start","kind":"noop"}"#, "");
        let err = from_json(&src).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn rejects_duplicate_node_ids() {
        let src = wf(r#"{"id":"n1","kind":"noop"},{"id":"n1","kind":"noop"}"#, "");
        let err = from_json(&src).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_edge_to_unknown_node() {
        let src = wf(
            r#"{"id":"n1","kind":"noop"}"#,
            r#"{"from":"start","to":"missing"}"#,
        );
        let err = from_json(&src).unwrap_err();
        assert!(err.to_string().contains("unknown node"));
    }

    #[test]
    fn accepts_well_formed_workflow() {
        let src = wf(
            r#"{"id":"n1","kind":"noop"}"#,
            r#"{"from":"start","to":"n1"},{"from":"n1","to":"end"}"#,
        );
        assert!(from_json(&src).is_ok());
    }

    #[test]
    fn rejects_empty_branch_routes() {
        let src = wf(r#"{"id":"n1","kind":"noop"}"#, r#"{"from":"start","routes":[]}"#);
        let err = from_json(&src).unwrap_err();
        assert!(err.to_string().contains("at least one route"));
    }
}

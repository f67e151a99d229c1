//! [`WorkflowId`] and [`NodeId`]: thin newtypes over `String` so the rest of
//! the engine never mistakes a node id for an arbitrary string at a type
//! level, while still round-tripping through JSON as a plain string.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A workflow's declared `id` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(String);

impl WorkflowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for WorkflowId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkflowId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A single node's `id` within a workflow. Node ids are unique within their
/// owning workflow, not globally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The compiler's synthetic entry node.
    pub fn start() -> Self {
        Self("start".to_string())
    }

    /// The compiler's synthetic exit node.
    pub fn end() -> Self {
        Self("end".to_string())
    }

    pub fn is_reserved(&self) -> bool {
        self.0 == "start" || self.0 == "end"
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ids() {
        assert!(NodeId::start().is_reserved());
        assert!(NodeId::end().is_reserved());
        assert!(!NodeId::new("fetch_user").is_reserved());
    }

    #[test]
    fn display_matches_source_string() {
        let id = WorkflowId::new("order-pipeline");
        assert_eq!(id.to_string(), "order-pipeline");
    }
}

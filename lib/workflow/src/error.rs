//! Error types for the workflow crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `GraphError`: A model edit was rejected (unknown node or edge)
//! - `ValidationError`: The graph breaks a structural rule
//! - `StoreError`: The workflow store could not read or write a graph
//!
//! Graph and validation errors are plain values returned from pure
//! functions. Only `StoreError` travels inside a `Report`, since it is the
//! one failure that comes from I/O.

use flowline_core::{EdgeId, NodeId, WorkflowId};
use std::fmt;

/// Errors from graph edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given id is not in the graph.
    UnknownNode { node_id: NodeId },
    /// Edge with the given id is not in the graph.
    UnknownEdge { edge_id: EdgeId },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode { node_id } => write!(f, "unknown node: {node_id}"),
            Self::UnknownEdge { edge_id } => write!(f, "unknown edge: {edge_id}"),
        }
    }
}

impl std::error::Error for GraphError {}

/// What is wrong with the workflow's trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerIssue {
    /// The graph has nodes but none of them is a trigger.
    Missing,
    /// More than one node claims the trigger role.
    Multiple { node_ids: Vec<NodeId> },
    /// The trigger exists but is not the first step.
    Misplaced { node_id: NodeId },
}

impl fmt::Display for TriggerIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "workflow has no trigger node"),
            Self::Multiple { node_ids } => {
                let ids: Vec<&str> = node_ids.iter().map(NodeId::as_str).collect();
                write!(f, "workflow has {} trigger nodes: {}", ids.len(), ids.join(", "))
            }
            Self::Misplaced { node_id } => {
                write!(f, "trigger node {node_id} is not the first step")
            }
        }
    }
}

/// Structural rule violations found by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Two nodes share an id.
    DuplicateNode { node_id: NodeId },
    /// Two edges share an id.
    DuplicateEdge { edge_id: EdgeId },
    /// Zero, several, or an out-of-place trigger.
    MissingOrMisplacedTrigger { issue: TriggerIssue },
    /// An edge points at a node that is not in the graph.
    DanglingEdge { edge_id: EdgeId, missing: NodeId },
    /// A node on the execution path has more than one outgoing or incoming edge.
    BranchingNotSupported { node_id: NodeId },
    /// Following edges from the trigger returns to an already visited node.
    CycleDetected { node_id: NodeId },
}

impl ValidationError {
    /// Returns a short, stable name for this kind of failure.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateNode { .. } => "duplicate_node",
            Self::DuplicateEdge { .. } => "duplicate_edge",
            Self::MissingOrMisplacedTrigger { .. } => "missing_or_misplaced_trigger",
            Self::DanglingEdge { .. } => "dangling_edge",
            Self::BranchingNotSupported { .. } => "branching_not_supported",
            Self::CycleDetected { .. } => "cycle_detected",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode { node_id } => write!(f, "node id {node_id} is used twice"),
            Self::DuplicateEdge { edge_id } => write!(f, "edge id {edge_id} is used twice"),
            Self::MissingOrMisplacedTrigger { issue } => write!(f, "{issue}"),
            Self::DanglingEdge { edge_id, missing } => {
                write!(f, "edge {edge_id} references missing node {missing}")
            }
            Self::BranchingNotSupported { node_id } => {
                write!(
                    f,
                    "node {node_id} branches or merges; only a single path is supported"
                )
            }
            Self::CycleDetected { node_id } => {
                write!(f, "workflow loops back to node {node_id}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors from the workflow store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No graph is stored for the workflow.
    NotFound { workflow_id: WorkflowId },
    /// Reading or writing the backing storage failed.
    Io { details: String },
    /// Stored data could not be encoded or decoded.
    Serialization { details: String },
    /// The database rejected the operation.
    Database { details: String },
}

impl StoreError {
    /// Returns whether this error means the workflow does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { workflow_id } => write!(f, "workflow not found: {workflow_id}"),
            Self::Io { details } => write!(f, "workflow storage i/o failed: {details}"),
            Self::Serialization { details } => {
                write!(f, "workflow record encoding failed: {details}")
            }
            Self::Database { details } => write!(f, "workflow database error: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_names_the_node() {
        let err = GraphError::UnknownNode {
            node_id: NodeId::new("n-9"),
        };
        assert_eq!(err.to_string(), "unknown node: n-9");
    }

    #[test]
    fn multiple_triggers_lists_ids() {
        let err = ValidationError::MissingOrMisplacedTrigger {
            issue: TriggerIssue::Multiple {
                node_ids: vec![NodeId::new("a"), NodeId::new("b")],
            },
        };
        assert_eq!(err.to_string(), "workflow has 2 trigger nodes: a, b");
        assert_eq!(err.kind(), "missing_or_misplaced_trigger");
    }

    #[test]
    fn dangling_edge_names_both_ends() {
        let err = ValidationError::DanglingEdge {
            edge_id: EdgeId::new("e1"),
            missing: NodeId::new("ghost"),
        };
        assert!(err.to_string().contains("e1"));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn store_not_found() {
        let err = StoreError::NotFound {
            workflow_id: WorkflowId::new("wf-1"),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("wf-1"));
    }
}

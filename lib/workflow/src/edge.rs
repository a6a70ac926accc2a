//! Edge types for workflow graphs.
//!
//! An edge says "after the source node, run the target node". Under the
//! linear execution contract a node has at most one incoming and one
//! outgoing edge, but the model itself does not enforce that; the
//! validator does.

use flowline_core::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier of this edge within its graph.
    pub id: EdgeId,
    /// The upstream node.
    pub source: NodeId,
    /// The downstream node.
    pub target: NodeId,
}

impl Edge {
    /// Creates an edge with a freshly generated id.
    #[must_use]
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: EdgeId::generate(),
            source,
            target,
        }
    }

    /// Returns whether this edge touches the given node at either end.
    #[must_use]
    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source == node_id || &self.target == node_id
    }

    /// Returns whether this edge connects `source` to `target`.
    #[must_use]
    pub fn connects(&self, source: &NodeId, target: &NodeId) -> bool {
        &self.source == source && &self.target == target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_touches_both_ends() {
        let a = NodeId::new("a");
        let b = NodeId::new("b");
        let edge = Edge::new(a.clone(), b.clone());

        assert!(edge.touches(&a));
        assert!(edge.touches(&b));
        assert!(!edge.touches(&NodeId::new("c")));
    }

    #[test]
    fn connects_is_directional() {
        let a = NodeId::new("a");
        let b = NodeId::new("b");
        let edge = Edge::new(a.clone(), b.clone());

        assert!(edge.connects(&a, &b));
        assert!(!edge.connects(&b, &a));
    }
}

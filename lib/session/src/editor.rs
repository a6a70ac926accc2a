//! The contract with the graph editor canvas.
//!
//! The canvas sends discrete events and draws whatever node and edge lists
//! it is given. It never sees the graph itself.

use flowline_core::{EdgeId, NodeId};
use flowline_workflow::{NodeRole, Position, ServiceKind, SubService, WorkflowGraph};
use serde::{Deserialize, Serialize};

/// A user action on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EditorEvent {
    /// A node of `service` was dragged from the palette and dropped.
    NodeDropped {
        service: ServiceKind,
        #[serde(default)]
        sub_service: Option<SubService>,
        position: Position,
    },
    /// The user drew an edge between two nodes.
    NodesConnected { source: NodeId, target: NodeId },
    /// A node was dragged to a new position.
    NodeMoved { node_id: NodeId, position: Position },
    /// A node was deleted.
    NodeDeleted { node_id: NodeId },
    /// An edge was deleted.
    EdgeDeleted { edge_id: EdgeId },
}

/// A node as the canvas draws it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    pub id: NodeId,
    pub position: Position,
    pub label: String,
    pub description: String,
    /// Picks the visual node type.
    pub kind: ServiceKind,
    pub sub_service: Option<SubService>,
    pub role: NodeRole,
}

/// An edge as the canvas draws it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
}

/// Everything the canvas needs to draw a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorSnapshot {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
    /// Whether the palette should offer action nodes rather than triggers.
    pub has_trigger: bool,
}

impl From<&WorkflowGraph> for EditorSnapshot {
    fn from(graph: &WorkflowGraph) -> Self {
        let nodes = graph
            .nodes()
            .iter()
            .map(|node| RenderNode {
                id: node.id.clone(),
                position: node.position,
                label: node.name.clone(),
                description: node.description.clone(),
                kind: node.service.clone(),
                sub_service: node.sub_service.clone(),
                role: node.role,
            })
            .collect();
        let edges = graph
            .edges()
            .iter()
            .map(|edge| RenderEdge {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
            })
            .collect();

        Self {
            nodes,
            edges,
            has_trigger: !graph.is_empty(),
        }
    }
}

//! Flat storage records and the mapping to and from [`WorkflowGraph`].
//!
//! Records are what the workflow store persists: one row per node with the
//! canvas position split into two columns, and one row per edge. The mapper
//! does not validate. Damaged data loads as-is so the user can see and fix
//! it; validation is the caller's decision.

use crate::edge::Edge;
use crate::graph::WorkflowGraph;
use crate::node::{Node, NodeRole, Position, ServiceKind, SubService};
use flowline_core::{EdgeId, NodeId, WorkflowId};
use serde::{Deserialize, Serialize};

/// A stored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub service: ServiceKind,
    #[serde(default)]
    pub sub_service: Option<SubService>,
    #[serde(rename = "workerType")]
    pub role: NodeRole,
    pub position_x: f64,
    pub position_y: f64,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            description: node.description.clone(),
            service: node.service.clone(),
            sub_service: node.sub_service.clone(),
            role: node.role,
            position_x: node.position.x,
            position_y: node.position.y,
        }
    }
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        Self {
            id: record.id,
            service: record.service,
            sub_service: record.sub_service,
            role: record.role,
            name: record.name,
            description: record.description,
            position: Position::new(record.position_x, record.position_y),
        }
    }
}

/// A stored edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub source_id: NodeId,
    pub target_id: NodeId,
}

impl From<&Edge> for EdgeRecord {
    fn from(edge: &Edge) -> Self {
        Self {
            id: edge.id.clone(),
            source_id: edge.source.clone(),
            target_id: edge.target.clone(),
        }
    }
}

impl From<EdgeRecord> for Edge {
    fn from(record: EdgeRecord) -> Self {
        Self {
            id: record.id,
            source: record.source_id,
            target: record.target_id,
        }
    }
}

/// All records for one workflow, in graph insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphRecords {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphRecords {
    #[must_use]
    pub fn new(nodes: Vec<NodeRecord>, edges: Vec<EdgeRecord>) -> Self {
        Self { nodes, edges }
    }

    /// Returns whether there are no node and no edge records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Flattens a graph into storage records.
#[must_use]
pub fn to_records(graph: &WorkflowGraph) -> GraphRecords {
    GraphRecords {
        nodes: graph.nodes().iter().map(NodeRecord::from).collect(),
        edges: graph.edges().iter().map(EdgeRecord::from).collect(),
    }
}

/// Rebuilds a graph from storage records, preserving ids and order.
#[must_use]
pub fn from_records(
    workflow_id: WorkflowId,
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
) -> WorkflowGraph {
    WorkflowGraph::from_parts(
        workflow_id,
        nodes.into_iter().map(Node::from).collect(),
        edges.into_iter().map(Edge::from).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeDraft;
    use crate::validate::validate;

    fn sample() -> WorkflowGraph {
        let mut graph = WorkflowGraph::new(WorkflowId::new("wf-records"));
        let trigger = graph.add_node(
            NodeDraft::new(ServiceKind::Google)
                .with_sub_service(SubService::GoogleMail)
                .at(12.5, -3.0),
        );
        let middle = graph.add_node(NodeDraft::new(ServiceKind::Github).at(300.0, 40.0));
        let last = graph.add_node(
            NodeDraft::new(ServiceKind::Google)
                .with_sub_service(SubService::GoogleDrive)
                .with_name("Upload")
                .at(600.0, 80.25),
        );
        graph.add_edge(&trigger.id, &middle.id).unwrap();
        graph.add_edge(&middle.id, &last.id).unwrap();
        graph
    }

    #[test]
    fn round_trip_preserves_graph() {
        let graph = sample();
        assert_eq!(validate(&graph), Ok(()));

        let records = to_records(&graph);
        let rebuilt = from_records(graph.workflow_id().clone(), records.nodes, records.edges);

        assert_eq!(rebuilt, graph);
    }

    #[test]
    fn position_is_split_into_columns() {
        let graph = sample();
        let records = to_records(&graph);

        assert_eq!(records.nodes.len(), 3);
        assert_eq!(records.edges.len(), 2);
        assert_eq!(records.nodes[0].position_x, 12.5);
        assert_eq!(records.nodes[0].position_y, -3.0);
        assert_eq!(records.edges[0].source_id, records.nodes[0].id);
        assert_eq!(records.edges[0].target_id, records.nodes[1].id);
    }

    #[test]
    fn dangling_records_still_load() {
        let nodes = vec![NodeRecord {
            id: NodeId::new("n1"),
            name: "Drive".to_string(),
            description: String::new(),
            service: ServiceKind::Google,
            sub_service: Some(SubService::GoogleDrive),
            role: NodeRole::Trigger,
            position_x: 0.0,
            position_y: 0.0,
        }];
        let edges = vec![EdgeRecord {
            id: EdgeId::new("e1"),
            source_id: NodeId::new("n1"),
            target_id: NodeId::new("gone"),
        }];

        let graph = from_records(WorkflowId::new("wf"), nodes, edges);

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 1);
        assert!(validate(&graph).is_err());
    }

    #[test]
    fn record_json_uses_stored_field_names() {
        let record = EdgeRecord {
            id: EdgeId::new("e1"),
            source_id: NodeId::new("a"),
            target_id: NodeId::new("b"),
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"id": "e1", "sourceId": "a", "targetId": "b"})
        );

        let node = NodeRecord::from(&sample().nodes()[1]);
        let json = serde_json::to_value(&node).expect("serialize");
        assert_eq!(json["type"], "Github");
        assert_eq!(json["workerType"], "Action");
        assert_eq!(json["positionX"], 300.0);
    }
}

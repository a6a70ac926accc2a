//! The editable workflow graph.
//!
//! Nodes and edges are kept in insertion order, which is what the sequencer
//! falls back to before any edges are drawn and what the persistence mapper
//! writes out. Traversal goes through a petgraph view built on demand by
//! [`WorkflowGraph::topology`]; edges whose endpoints are missing are kept
//! aside there instead of being dropped, so a damaged graph loaded from
//! storage can still be shown and repaired.

use crate::edge::Edge;
use crate::error::GraphError;
use crate::node::{Node, NodeDraft, NodeRole, Position};
use flowline_core::{EdgeId, NodeId, WorkflowId};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A workflow's nodes and edges.
///
/// Equality is structural: two graphs are equal when their ids, field
/// values and orderings match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    workflow_id: WorkflowId,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl WorkflowGraph {
    /// Creates an empty graph for a workflow.
    #[must_use]
    pub fn new(workflow_id: WorkflowId) -> Self {
        Self {
            workflow_id,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Creates a graph from already-built nodes and edges, unchecked.
    #[must_use]
    pub fn from_parts(workflow_id: WorkflowId, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            workflow_id,
            nodes,
            edges,
        }
    }

    /// Returns the workflow this graph belongs to.
    #[must_use]
    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    /// Adds a node built from `draft`.
    ///
    /// The first node added to an empty graph defaults to the trigger role;
    /// every later node defaults to an action.
    pub fn add_node(&mut self, draft: NodeDraft) -> Node {
        let default_role = if self.nodes.is_empty() {
            NodeRole::Trigger
        } else {
            NodeRole::Action
        };
        let node = draft.into_node(default_role);
        self.nodes.push(node.clone());
        node
    }

    /// Connects `source` to `target`.
    ///
    /// Connecting a pair that is already connected returns the existing edge.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` if either endpoint is not in the graph.
    pub fn add_edge(&mut self, source: &NodeId, target: &NodeId) -> Result<Edge, GraphError> {
        for node_id in [source, target] {
            if self.node(node_id).is_none() {
                return Err(GraphError::UnknownNode {
                    node_id: node_id.clone(),
                });
            }
        }

        if let Some(existing) = self.edges.iter().find(|e| e.connects(source, target)) {
            return Ok(existing.clone());
        }

        let edge = Edge::new(source.clone(), target.clone());
        self.edges.push(edge.clone());
        Ok(edge)
    }

    /// Moves a node on the canvas.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` if the node is not in the graph.
    pub fn move_node(&mut self, node_id: &NodeId, position: Position) -> Result<(), GraphError> {
        self.node_mut(node_id)?.position = position;
        Ok(())
    }

    /// Replaces a node's name and description.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` if the node is not in the graph.
    pub fn rename_node(
        &mut self,
        node_id: &NodeId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), GraphError> {
        let node = self.node_mut(node_id)?;
        node.name = name.into();
        node.description = description.into();
        Ok(())
    }

    /// Removes a node and every edge touching it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` if the node is not in the graph.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Result<Node, GraphError> {
        let position = self
            .nodes
            .iter()
            .position(|n| &n.id == node_id)
            .ok_or_else(|| GraphError::UnknownNode {
                node_id: node_id.clone(),
            })?;
        self.edges.retain(|e| !e.touches(node_id));
        Ok(self.nodes.remove(position))
    }

    /// Removes an edge.
    ///
    /// # Errors
    ///
    /// Returns `UnknownEdge` if the edge is not in the graph.
    pub fn remove_edge(&mut self, edge_id: &EdgeId) -> Result<Edge, GraphError> {
        let position = self
            .edges
            .iter()
            .position(|e| &e.id == edge_id)
            .ok_or_else(|| GraphError::UnknownEdge {
                edge_id: edge_id.clone(),
            })?;
        Ok(self.edges.remove(position))
    }

    /// Returns a node by id.
    #[must_use]
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == node_id)
    }

    fn node_mut(&mut self, node_id: &NodeId) -> Result<&mut Node, GraphError> {
        self.nodes
            .iter_mut()
            .find(|n| &n.id == node_id)
            .ok_or_else(|| GraphError::UnknownNode {
                node_id: node_id.clone(),
            })
    }

    /// Returns an edge by id.
    #[must_use]
    pub fn edge(&self, edge_id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == edge_id)
    }

    /// Returns all nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns all edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the nodes whose role is `Trigger`, in insertion order.
    pub fn triggers(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_trigger())
    }

    /// Builds the traversal view of this graph.
    #[must_use]
    pub fn topology(&self) -> Topology<'_> {
        Topology::build(self)
    }
}

/// A read-only petgraph view of a [`WorkflowGraph`].
///
/// Edge iteration follows the owning graph's insertion order.
pub struct Topology<'g> {
    graph: DiGraph<&'g Node, &'g Edge>,
    index: HashMap<&'g NodeId, NodeIndex>,
    dangling: Vec<(&'g Edge, &'g NodeId)>,
}

impl<'g> Topology<'g> {
    fn build(source: &'g WorkflowGraph) -> Self {
        let mut graph = DiGraph::with_capacity(source.nodes.len(), source.edges.len());
        let mut index = HashMap::with_capacity(source.nodes.len());
        let mut dangling = Vec::new();

        for node in &source.nodes {
            let idx = graph.add_node(node);
            // On a repeated id the first node keeps the slot.
            index.entry(&node.id).or_insert(idx);
        }

        for edge in &source.edges {
            match (index.get(&edge.source), index.get(&edge.target)) {
                (Some(&from), Some(&to)) => {
                    graph.add_edge(from, to, edge);
                }
                (None, _) => dangling.push((edge, &edge.source)),
                (_, None) => dangling.push((edge, &edge.target)),
            }
        }

        Self {
            graph,
            index,
            dangling,
        }
    }

    /// Edges with a missing endpoint, paired with the missing node id.
    #[must_use]
    pub fn dangling(&self) -> &[(&'g Edge, &'g NodeId)] {
        &self.dangling
    }

    /// Downstream nodes of `node_id`, in edge insertion order.
    #[must_use]
    pub fn successors(&self, node_id: &NodeId) -> Vec<&'g Node> {
        self.neighbors(node_id, Direction::Outgoing)
    }

    /// Upstream nodes of `node_id`, in edge insertion order.
    #[must_use]
    pub fn predecessors(&self, node_id: &NodeId) -> Vec<&'g Node> {
        self.neighbors(node_id, Direction::Incoming)
    }

    /// Number of edges leaving `node_id`.
    #[must_use]
    pub fn out_degree(&self, node_id: &NodeId) -> usize {
        self.degree(node_id, Direction::Outgoing)
    }

    /// Number of edges arriving at `node_id`.
    #[must_use]
    pub fn in_degree(&self, node_id: &NodeId) -> usize {
        self.degree(node_id, Direction::Incoming)
    }

    fn degree(&self, node_id: &NodeId, direction: Direction) -> usize {
        self.index
            .get(node_id)
            .map_or(0, |&idx| self.graph.edges_directed(idx, direction).count())
    }

    fn neighbors(&self, node_id: &NodeId, direction: Direction) -> Vec<&'g Node> {
        let Some(&idx) = self.index.get(node_id) else {
            return Vec::new();
        };

        // petgraph walks adjacency lists newest-first; restore insertion order.
        let mut edges: Vec<_> = self.graph.edges_directed(idx, direction).collect();
        edges.sort_by_key(|e| e.id());

        edges
            .into_iter()
            .filter_map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.graph.node_weight(other).copied()
            })
            .collect()
    }
}

//! Derivation of the ordered step list from a graph.
//!
//! Steps start at the trigger and follow edges one at a time. Before any
//! edges are drawn, node insertion order is used instead, so a workflow is
//! navigable while it is still being built. Nodes left off the path are
//! appended in insertion order so every node stays reachable from the
//! step strip.
//!
//! Sequencing never fails. A graph that does not validate still yields a
//! best-effort order (the first outgoing edge wins, revisits are skipped),
//! and a node with no registered handler yields a step flagged as
//! unhandled.

use crate::graph::{Topology, WorkflowGraph};
use crate::handler::{HandlerKey, HandlerKind, HandlerRegistry};
use crate::node::Node;
use flowline_core::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A step with no handler for its node type.
///
/// The step renders nothing but can still be navigated to and past.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnhandledNodeType {
    pub node_id: NodeId,
    pub key: HandlerKey,
}

impl fmt::Display for UnhandledNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no handler for node {} ({})", self.node_id, self.key)
    }
}

/// How a step is driven.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepHandler {
    Handled { kind: HandlerKind },
    Unhandled(UnhandledNodeType),
}

/// A 1-based position of a node in the execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub index: usize,
    pub node: Node,
    pub handler: StepHandler,
}

impl Step {
    /// Returns the handler, if one is registered for this step's node.
    #[must_use]
    pub fn handler_kind(&self) -> Option<HandlerKind> {
        match &self.handler {
            StepHandler::Handled { kind } => Some(*kind),
            StepHandler::Unhandled(_) => None,
        }
    }
}

/// Returns the node the execution order starts at.
///
/// With no edges this is the first node inserted. Otherwise it is the sole
/// trigger, provided nothing points at it.
pub(crate) fn entry_node<'g>(graph: &'g WorkflowGraph, topology: &Topology<'g>) -> Option<&'g Node> {
    if graph.edges().is_empty() {
        return graph.nodes().first();
    }
    let mut triggers = graph.triggers();
    let trigger = triggers.next()?;
    if triggers.next().is_some() || topology.in_degree(&trigger.id) > 0 {
        return None;
    }
    Some(trigger)
}

/// Returns the graph's nodes in execution order.
#[must_use]
pub fn execution_order(graph: &WorkflowGraph) -> Vec<&Node> {
    if graph.edges().is_empty() {
        return graph.nodes().iter().collect();
    }

    let topology = graph.topology();
    let start = entry_node(graph, &topology)
        .or_else(|| graph.triggers().next())
        .or_else(|| graph.nodes().first());
    let Some(start) = start else {
        return Vec::new();
    };

    let mut visited: HashSet<&NodeId> = HashSet::new();
    let mut order = Vec::with_capacity(graph.node_count());
    let mut current = Some(start);
    while let Some(node) = current {
        visited.insert(&node.id);
        order.push(node);
        current = topology
            .successors(&node.id)
            .into_iter()
            .find(|next| !visited.contains(&next.id));
    }

    order.extend(graph.nodes().iter().filter(|n| !visited.contains(&n.id)));
    order
}

/// Derives the step list for a graph.
#[must_use]
pub fn sequence(graph: &WorkflowGraph, registry: &HandlerRegistry) -> Vec<Step> {
    execution_order(graph)
        .into_iter()
        .enumerate()
        .map(|(offset, node)| {
            let key = HandlerKey::from(node);
            let handler = match registry.resolve(&key) {
                Some(kind) => StepHandler::Handled { kind },
                None => StepHandler::Unhandled(UnhandledNodeType {
                    node_id: node.id.clone(),
                    key,
                }),
            };
            Step {
                index: offset + 1,
                node: node.clone(),
                handler,
            }
        })
        .collect()
}

/// The current position within a step list.
///
/// Requests for a step outside `1..=len` are ignored rather than rejected,
/// so boundary taps on back/next never fail. Re-applying the same index to
/// the same step list always lands on the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCursor {
    current: usize,
}

impl StepCursor {
    /// Creates a cursor at step 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { current: 1 }
    }

    /// Returns the current step index, or `None` when there are no steps.
    #[must_use]
    pub fn current(&self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.current.clamp(1, len))
    }

    /// Moves to step `n` if it exists. Returns whether the cursor moved.
    pub fn go_to(&mut self, n: usize, len: usize) -> bool {
        if (1..=len).contains(&n) {
            self.current = n;
            true
        } else {
            false
        }
    }

    /// Advances one step unless already at the last one.
    pub fn next(&mut self, len: usize) -> bool {
        let Some(current) = self.current(len) else {
            return false;
        };
        self.go_to(current + 1, len)
    }

    /// Goes back one step unless already at the first one.
    pub fn previous(&mut self, len: usize) -> bool {
        let Some(current) = self.current(len) else {
            return false;
        };
        current > 1 && self.go_to(current - 1, len)
    }

    /// Pulls the cursor back inside `1..=len` after the step list changed.
    pub fn reconcile(&mut self, len: usize) {
        self.current = self.current.clamp(1, len.max(1));
    }

    /// Returns whether the cursor is on the final step.
    #[must_use]
    pub fn is_last(&self, len: usize) -> bool {
        self.current(len) == Some(len)
    }
}

impl Default for StepCursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeDraft, NodeRole, ServiceKind, SubService};
    use flowline_core::WorkflowId;

    fn graph() -> WorkflowGraph {
        WorkflowGraph::new(WorkflowId::new("wf-seq"))
    }

    fn drive() -> NodeDraft {
        NodeDraft::new(ServiceKind::Google).with_sub_service(SubService::GoogleDrive)
    }

    fn github() -> NodeDraft {
        NodeDraft::new(ServiceKind::Github)
    }

    #[test]
    fn empty_graph_has_no_steps() {
        assert!(sequence(&graph(), &HandlerRegistry::standard()).is_empty());
    }

    #[test]
    fn drive_trigger_then_github_action() {
        let mut graph = graph();
        let trigger = graph.add_node(drive());
        let action = graph.add_node(github());
        graph.add_edge(&trigger.id, &action.id).unwrap();

        let steps = sequence(&graph, &HandlerRegistry::standard());

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].index, 1);
        assert_eq!(steps[0].node.id, trigger.id);
        assert_eq!(steps[0].handler_kind(), Some(HandlerKind::DriveTrigger));
        assert_eq!(steps[1].index, 2);
        assert_eq!(steps[1].node.id, action.id);
        assert_eq!(steps[1].handler_kind(), Some(HandlerKind::GithubAction));
    }

    #[test]
    fn edges_override_insertion_order() {
        let mut graph = graph();
        let trigger = graph.add_node(drive());
        let late = graph.add_node(github());
        let early = graph.add_node(github());
        graph.add_edge(&trigger.id, &early.id).unwrap();
        graph.add_edge(&early.id, &late.id).unwrap();

        let ids: Vec<_> = execution_order(&graph).into_iter().map(|n| &n.id).collect();
        assert_eq!(ids, vec![&trigger.id, &early.id, &late.id]);
    }

    #[test]
    fn no_edges_falls_back_to_insertion_order() {
        let mut graph = graph();
        let a = graph.add_node(drive());
        let b = graph.add_node(github());
        let c = graph.add_node(github());

        let steps = sequence(&graph, &HandlerRegistry::standard());
        let ids: Vec<_> = steps.iter().map(|s| &s.node.id).collect();
        assert_eq!(ids, vec![&a.id, &b.id, &c.id]);
        assert_eq!(
            steps.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn unconnected_nodes_follow_the_path() {
        let mut graph = graph();
        let trigger = graph.add_node(drive());
        let loose = graph.add_node(github());
        let linked = graph.add_node(github());
        graph.add_edge(&trigger.id, &linked.id).unwrap();

        let ids: Vec<_> = execution_order(&graph).into_iter().map(|n| &n.id).collect();
        assert_eq!(ids, vec![&trigger.id, &linked.id, &loose.id]);
    }

    #[test]
    fn unhandled_type_flags_the_step_without_dropping_it() {
        let mut graph = graph();
        let trigger = graph.add_node(NodeDraft::new(ServiceKind::Google));
        let action = graph.add_node(NodeDraft::new(ServiceKind::from("Slack")));
        graph.add_edge(&trigger.id, &action.id).unwrap();

        let steps = sequence(&graph, &HandlerRegistry::standard());

        assert_eq!(steps.len(), 2);
        match &steps[0].handler {
            StepHandler::Unhandled(unhandled) => {
                assert_eq!(unhandled.node_id, trigger.id);
                assert_eq!(unhandled.key.role, NodeRole::Trigger);
            }
            other => panic!("expected unhandled step, got {other:?}"),
        }
        assert!(steps[1].handler_kind().is_none());
    }

    #[test]
    fn cyclic_graph_still_terminates() {
        let mut graph = graph();
        let a = graph.add_node(drive());
        let b = graph.add_node(github());
        let c = graph.add_node(github());
        graph.add_edge(&a.id, &b.id).unwrap();
        graph.add_edge(&b.id, &c.id).unwrap();
        graph.add_edge(&c.id, &b.id).unwrap();

        assert_eq!(execution_order(&graph).len(), 3);
    }

    #[test]
    fn sequencing_is_deterministic() {
        let mut graph = graph();
        let a = graph.add_node(drive());
        let b = graph.add_node(github());
        graph.add_edge(&a.id, &b.id).unwrap();

        let registry = HandlerRegistry::standard();
        assert_eq!(sequence(&graph, &registry), sequence(&graph, &registry));
    }

    #[test]
    fn cursor_ignores_out_of_range_requests() {
        let mut cursor = StepCursor::new();
        assert!(cursor.go_to(2, 3));
        assert!(!cursor.go_to(0, 3));
        assert!(!cursor.go_to(4, 3));
        assert_eq!(cursor.current(3), Some(2));
    }

    #[test]
    fn cursor_next_and_previous_stop_at_bounds() {
        let mut cursor = StepCursor::new();
        assert!(!cursor.previous(2));
        assert!(cursor.next(2));
        assert!(cursor.is_last(2));
        assert!(!cursor.next(2));
        assert_eq!(cursor.current(2), Some(2));
        assert!(cursor.previous(2));
        assert_eq!(cursor.current(2), Some(1));
    }

    #[test]
    fn cursor_on_empty_list() {
        let mut cursor = StepCursor::new();
        assert_eq!(cursor.current(0), None);
        assert!(!cursor.next(0));
        assert!(!cursor.is_last(0));
    }

    #[test]
    fn cursor_reconciles_when_steps_shrink() {
        let mut cursor = StepCursor::new();
        cursor.go_to(5, 5);
        cursor.reconcile(2);
        assert_eq!(cursor.current(2), Some(2));
        cursor.reconcile(0);
        assert_eq!(cursor.current(3), Some(1));
    }
}

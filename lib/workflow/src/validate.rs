//! Structural validation of workflow graphs.
//!
//! Validation is separate from sequencing so that a graph can be
//! temporarily broken while the user is still drawing it. Only saving and
//! publishing require a valid graph.
//!
//! Rules are checked in order and the first failure wins:
//! 1. Node ids and edge ids are unique.
//! 2. At most one trigger node.
//! 3. A non-empty graph has exactly one trigger and it is the first step.
//! 4. Every edge's endpoints exist.
//! 5. Following edges from the trigger visits each node at most once and
//!    never branches or merges.

use crate::error::{TriggerIssue, ValidationError};
use crate::graph::WorkflowGraph;
use crate::node::Node;
use crate::sequence::entry_node;
use flowline_core::NodeId;
use std::collections::HashSet;

/// Checks a graph against the linear execution contract.
///
/// An empty graph is valid.
///
/// # Errors
///
/// Returns the first rule the graph breaks.
pub fn validate(graph: &WorkflowGraph) -> Result<(), ValidationError> {
    if graph.is_empty() {
        return Ok(());
    }

    let mut node_ids = HashSet::new();
    if let Some(node) = graph.nodes().iter().find(|n| !node_ids.insert(&n.id)) {
        return Err(ValidationError::DuplicateNode {
            node_id: node.id.clone(),
        });
    }
    let mut edge_ids = HashSet::new();
    if let Some(edge) = graph.edges().iter().find(|e| !edge_ids.insert(&e.id)) {
        return Err(ValidationError::DuplicateEdge {
            edge_id: edge.id.clone(),
        });
    }

    let triggers: Vec<&Node> = graph.triggers().collect();
    let trigger = match triggers.as_slice() {
        [] => {
            return Err(ValidationError::MissingOrMisplacedTrigger {
                issue: TriggerIssue::Missing,
            });
        }
        [single] => *single,
        many => {
            return Err(ValidationError::MissingOrMisplacedTrigger {
                issue: TriggerIssue::Multiple {
                    node_ids: many.iter().map(|n| n.id.clone()).collect(),
                },
            });
        }
    };

    let topology = graph.topology();

    let first_is_trigger = entry_node(graph, &topology).is_some_and(|n| n.id == trigger.id);
    if !first_is_trigger {
        return Err(ValidationError::MissingOrMisplacedTrigger {
            issue: TriggerIssue::Misplaced {
                node_id: trigger.id.clone(),
            },
        });
    }

    if let Some((edge, missing)) = topology.dangling().first() {
        return Err(ValidationError::DanglingEdge {
            edge_id: edge.id.clone(),
            missing: (*missing).clone(),
        });
    }

    let mut visited: HashSet<&NodeId> = HashSet::new();
    let mut path: Vec<&NodeId> = Vec::new();
    let mut current = trigger;
    loop {
        visited.insert(&current.id);
        path.push(&current.id);

        let next = match topology.successors(&current.id).as_slice() {
            [] => break,
            [next] => *next,
            _ => {
                return Err(ValidationError::BranchingNotSupported {
                    node_id: current.id.clone(),
                });
            }
        };

        if visited.contains(&next.id) {
            return Err(ValidationError::CycleDetected {
                node_id: next.id.clone(),
            });
        }
        current = next;
    }

    // Merges from nodes off the path still break the single-path contract.
    if let Some(merge) = path.iter().find(|id| topology.in_degree(id) > 1) {
        return Err(ValidationError::BranchingNotSupported {
            node_id: (*merge).clone(),
        });
    }

    Ok(())
}

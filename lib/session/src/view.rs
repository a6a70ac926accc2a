//! What the step page hands to configuration views and navigation chrome.

use flowline_core::NodeId;
use flowline_workflow::{Node, Step, StepHandler};
use serde::{Deserialize, Serialize};

/// The input of a per-node configuration view.
///
/// Views edit the node's service settings and may ask the session to move
/// between steps. They never change the graph's structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepView {
    pub node_id: NodeId,
    pub step_index: usize,
    pub is_last_step: bool,
    /// The step the view's "continue" action leads to.
    pub next_step: Option<usize>,
    pub handler: StepHandler,
    pub node: Node,
}

impl StepView {
    /// Builds the view for the step at `current` (1-based).
    #[must_use]
    pub fn for_step(steps: &[Step], current: usize) -> Option<Self> {
        let step = steps.get(current.checked_sub(1)?)?;
        let is_last_step = step.index == steps.len();
        Some(Self {
            node_id: step.node.id.clone(),
            step_index: step.index,
            is_last_step,
            next_step: (!is_last_step).then_some(step.index + 1),
            handler: step.handler.clone(),
            node: step.node.clone(),
        })
    }
}

/// One numbered button in the step strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripEntry {
    pub index: usize,
    pub active: bool,
}

/// The numbered step buttons plus back/next/publish state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStrip {
    pub entries: Vec<StripEntry>,
    pub can_go_back: bool,
    /// On the last step the "next" button becomes "publish".
    pub shows_publish: bool,
}

impl StepStrip {
    #[must_use]
    pub fn new(len: usize, current: Option<usize>) -> Self {
        let Some(current) = current else {
            return Self::default();
        };
        Self {
            entries: (1..=len)
                .map(|index| StripEntry {
                    index,
                    active: index == current,
                })
                .collect(),
            can_go_back: current > 1,
            shows_publish: current == len,
        }
    }
}

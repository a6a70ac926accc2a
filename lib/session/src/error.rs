//! Error types for workflow sessions.
//!
//! Errors are designed for layered context using rootcause. Store failures
//! arrive as `Report<StoreError>` and are wrapped with
//! `SessionError::Store` via `.context()`, keeping the store report as the
//! child.

use flowline_core::WorkflowId;
use flowline_workflow::{GraphError, ServiceKind, ValidationError};
use std::fmt;

/// Errors from session operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// An edit referenced a node or edge the graph does not have.
    Graph(GraphError),
    /// A node of a kind that cannot start a workflow was dropped onto an empty graph.
    FirstNodeMustBeTrigger { service: ServiceKind },
    /// The graph breaks a structural rule; saving and publishing are blocked.
    Validation(ValidationError),
    /// The store has nothing for this workflow.
    NotFound { workflow_id: WorkflowId },
    /// The store failed to read or write. The in-memory graph is untouched.
    Store {
        workflow_id: WorkflowId,
        details: String,
    },
    /// The last load failed, so the session does not hold the stored graph.
    NotLoaded { workflow_id: WorkflowId },
    /// The graph has edits that have not been saved.
    UnsavedChanges,
    /// The workflow has no nodes.
    IncompleteWorkflow,
    /// Publishing is only offered from the last step.
    NotOnFinalStep { current: usize, last: usize },
    /// The session was closed.
    Closed,
}

impl SessionError {
    /// Returns whether retrying the same operation may succeed without edits.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { .. })
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph(e) => write!(f, "edit rejected: {e}"),
            Self::FirstNodeMustBeTrigger { service } => {
                write!(f, "the first node must be a trigger node; {service} cannot trigger")
            }
            Self::Validation(e) => write!(f, "workflow is invalid: {e}"),
            Self::NotFound { workflow_id } => write!(f, "workflow not found: {workflow_id}"),
            Self::Store {
                workflow_id,
                details,
            } => write!(f, "storage failed for workflow {workflow_id}: {details}"),
            Self::NotLoaded { workflow_id } => {
                write!(f, "workflow {workflow_id} failed to load; reload before saving")
            }
            Self::UnsavedChanges => write!(f, "workflow has unsaved changes"),
            Self::IncompleteWorkflow => write!(f, "workflow has no steps"),
            Self::NotOnFinalStep { current, last } => {
                write!(f, "publish is only available on step {last}, not step {current}")
            }
            Self::Closed => write!(f, "session is closed"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<GraphError> for SessionError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<ValidationError> for SessionError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

//! Error types for the HTTP shell.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use flowline_core::WorkflowId;
use flowline_session::SessionError;
use rootcause::Report;
use serde::Serialize;
use std::fmt;

/// Errors that stop the server from starting.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration is missing or invalid.
    Config { details: String },
    /// The configured store could not be opened.
    Store { details: String },
    /// Binding or serving the listener failed.
    Io { details: String },
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "configuration error: {details}"),
            Self::Store { details } => write!(f, "store unavailable: {details}"),
            Self::Io { details } => write!(f, "server I/O error: {details}"),
        }
    }
}

impl std::error::Error for ServerError {}

/// Errors returned by request handlers.
#[derive(Debug)]
pub enum ApiError {
    /// No session is open for the workflow.
    NoSession { workflow_id: WorkflowId },
    /// A session operation failed.
    Session(Report<SessionError>),
}

impl From<Report<SessionError>> for ApiError {
    fn from(report: Report<SessionError>) -> Self {
        Self::Session(report)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn status_for(error: &SessionError) -> (StatusCode, &'static str) {
    match error {
        SessionError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        SessionError::Graph(_) => (StatusCode::UNPROCESSABLE_ENTITY, "edit_rejected"),
        SessionError::FirstNodeMustBeTrigger { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "first_node_must_be_trigger")
        }
        SessionError::Validation(issue) => (StatusCode::CONFLICT, issue.kind()),
        SessionError::NotLoaded { .. } => (StatusCode::CONFLICT, "reload_required"),
        SessionError::UnsavedChanges => (StatusCode::CONFLICT, "unsaved_changes"),
        SessionError::IncompleteWorkflow => (StatusCode::CONFLICT, "incomplete_workflow"),
        SessionError::NotOnFinalStep { .. } => (StatusCode::CONFLICT, "not_on_final_step"),
        SessionError::Closed => (StatusCode::CONFLICT, "session_closed"),
        SessionError::Store { .. } => (StatusCode::BAD_GATEWAY, "store_unavailable"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::NoSession { workflow_id } => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "no_session",
                    message: format!("no open session for workflow {workflow_id}"),
                },
            ),
            Self::Session(report) => {
                let error = report.current_context();
                let (status, code) = status_for(error);
                if status.is_server_error() {
                    tracing::error!(error = %report, "Workflow store failed");
                } else {
                    tracing::debug!(error = %error, "Request rejected");
                }
                (
                    status,
                    ErrorBody {
                        error: code,
                        message: error.to_string(),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowline_core::NodeId;
    use flowline_workflow::{GraphError, ValidationError};

    #[test]
    fn statuses_follow_error_class() {
        let not_found = SessionError::NotFound {
            workflow_id: WorkflowId::new("wf"),
        };
        assert_eq!(status_for(&not_found).0, StatusCode::NOT_FOUND);

        let rejected = SessionError::Graph(GraphError::UnknownNode {
            node_id: NodeId::new("n"),
        });
        assert_eq!(status_for(&rejected).0, StatusCode::UNPROCESSABLE_ENTITY);

        let invalid = SessionError::Validation(ValidationError::CycleDetected {
            node_id: NodeId::new("n"),
        });
        assert_eq!(status_for(&invalid), (StatusCode::CONFLICT, "cycle_detected"));

        assert_eq!(status_for(&SessionError::UnsavedChanges).0, StatusCode::CONFLICT);
        let not_loaded = SessionError::NotLoaded {
            workflow_id: WorkflowId::new("wf"),
        };
        assert_eq!(
            status_for(&not_loaded),
            (StatusCode::CONFLICT, "reload_required")
        );

        let store = SessionError::Store {
            workflow_id: WorkflowId::new("wf"),
            details: "down".to_string(),
        };
        assert_eq!(status_for(&store).0, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn missing_session_is_not_found() {
        let response = ApiError::NoSession {
            workflow_id: WorkflowId::new("wf"),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

//! HTTP routes over workflow sessions.
//!
//! Every route except workflow creation works on the session opened by
//! `POST /workflows/{id}/session`. Responses carry the session snapshot so
//! the client can redraw without a second request.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use flowline_core::WorkflowId;
use flowline_session::{
    EditOp, EditOutcome, EditorEvent, Published, SaveReport, SessionError, SessionSnapshot,
    StepAddress, StepQuery,
};
use flowline_workflow::GraphRecords;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/workflows", post(create_workflow))
        .route(
            "/workflows/{id}/session",
            post(open_session).get(get_session).delete(close_session),
        )
        .route("/workflows/{id}/events", post(apply_event))
        .route("/workflows/{id}/edits", post(apply_edit))
        .route("/workflows/{id}/steps/next", post(next_step))
        .route("/workflows/{id}/steps/previous", post(previous_step))
        .route("/workflows/{id}/steps/{n}", post(go_to_step))
        .route("/workflows/{id}/save", post(save))
        .route("/workflows/{id}/publish", post(publish))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Response for a newly created workflow.
#[derive(Debug, Serialize)]
pub struct CreatedWorkflow {
    pub workflow_id: WorkflowId,
    pub editor_url: String,
    pub step_url: String,
}

/// Response for an accepted edit.
#[derive(Debug, Serialize)]
pub struct EditResponse {
    pub outcome: EditOutcome,
    pub session: SessionSnapshot,
}

/// Response for a navigation request.
#[derive(Debug, Serialize)]
pub struct NavigationResponse {
    /// False when the request was out of range and ignored.
    pub moved: bool,
    pub session: SessionSnapshot,
}

/// POST /workflows
///
/// Stores an empty graph under a fresh id.
async fn create_workflow(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreatedWorkflow>), ApiError> {
    let workflow_id = WorkflowId::generate();
    state
        .store()
        .write_graph(&workflow_id, &GraphRecords::default())
        .await
        .map_err(|report| {
            let details = report.current_context().to_string();
            ApiError::Session(report.context(SessionError::Store {
                workflow_id: workflow_id.clone(),
                details,
            }))
        })?;

    tracing::info!(workflow_id = %workflow_id, "Created workflow");
    Ok((
        StatusCode::CREATED,
        Json(CreatedWorkflow {
            editor_url: StepAddress::editor_url(&workflow_id),
            step_url: StepAddress::new(workflow_id.clone(), 1).to_string(),
            workflow_id,
        }),
    ))
}

/// POST /workflows/{id}/session?step=n
///
/// Loads (or reloads) the workflow and moves to step `n` when it exists.
async fn open_session(
    State(state): State<AppState>,
    Path(workflow_id): Path<WorkflowId>,
    Query(query): Query<StepQuery>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = state.open(&workflow_id).await;

    // A session that never loaded holds an empty graph; keeping it would let
    // a later save overwrite what the store has.
    if let Err(report) = session.load_at(query.step()).await {
        state.discard(&session).await;
        return Err(report.into());
    }
    Ok(Json(session.snapshot()))
}

/// GET /workflows/{id}/session
async fn get_session(
    State(state): State<AppState>,
    Path(workflow_id): Path<WorkflowId>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = state.session(&workflow_id).await?;
    Ok(Json(session.snapshot()))
}

/// DELETE /workflows/{id}/session
async fn close_session(
    State(state): State<AppState>,
    Path(workflow_id): Path<WorkflowId>,
) -> Result<StatusCode, ApiError> {
    if state.close(&workflow_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NoSession { workflow_id })
    }
}

/// POST /workflows/{id}/events
async fn apply_event(
    State(state): State<AppState>,
    Path(workflow_id): Path<WorkflowId>,
    Json(event): Json<EditorEvent>,
) -> Result<Json<EditResponse>, ApiError> {
    let session = state.session(&workflow_id).await?;
    let outcome = session.handle_event(event)?;
    Ok(Json(EditResponse {
        outcome,
        session: session.snapshot(),
    }))
}

/// POST /workflows/{id}/edits
async fn apply_edit(
    State(state): State<AppState>,
    Path(workflow_id): Path<WorkflowId>,
    Json(op): Json<EditOp>,
) -> Result<Json<EditResponse>, ApiError> {
    let session = state.session(&workflow_id).await?;
    let outcome = session.apply_edit(op)?;
    Ok(Json(EditResponse {
        outcome,
        session: session.snapshot(),
    }))
}

/// POST /workflows/{id}/steps/{n}
async fn go_to_step(
    State(state): State<AppState>,
    Path((workflow_id, n)): Path<(WorkflowId, usize)>,
) -> Result<Json<NavigationResponse>, ApiError> {
    let session = state.session(&workflow_id).await?;
    let moved = session.go_to_step(n);
    Ok(Json(NavigationResponse {
        moved,
        session: session.snapshot(),
    }))
}

/// POST /workflows/{id}/steps/next
async fn next_step(
    State(state): State<AppState>,
    Path(workflow_id): Path<WorkflowId>,
) -> Result<Json<NavigationResponse>, ApiError> {
    let session = state.session(&workflow_id).await?;
    let moved = session.next();
    Ok(Json(NavigationResponse {
        moved,
        session: session.snapshot(),
    }))
}

/// POST /workflows/{id}/steps/previous
async fn previous_step(
    State(state): State<AppState>,
    Path(workflow_id): Path<WorkflowId>,
) -> Result<Json<NavigationResponse>, ApiError> {
    let session = state.session(&workflow_id).await?;
    let moved = session.previous();
    Ok(Json(NavigationResponse {
        moved,
        session: session.snapshot(),
    }))
}

/// POST /workflows/{id}/save
async fn save(
    State(state): State<AppState>,
    Path(workflow_id): Path<WorkflowId>,
) -> Result<Json<SaveReport>, ApiError> {
    let session = state.session(&workflow_id).await?;
    Ok(Json(session.save().await?))
}

/// POST /workflows/{id}/publish
async fn publish(
    State(state): State<AppState>,
    Path(workflow_id): Path<WorkflowId>,
) -> Result<Json<Published>, ApiError> {
    let session = state.session(&workflow_id).await?;
    Ok(Json(session.publish()?))
}

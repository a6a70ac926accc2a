//! The workflow editing session.
//!
//! A session owns the live graph for one workflow. Every accepted edit
//! bumps a revision counter and re-derives the step list; a successful save
//! records the revision it wrote. Publishing compares the two.
//!
//! Edits are synchronous and applied one at a time under the state lock.
//! Loads and saves await the store without holding that lock, so the user
//! can keep editing while a save is in flight. Saves are serialized by a
//! separate async gate, and each save snapshots the graph only after it
//! has passed the gate.

use crate::address::StepAddress;
use crate::editor::{EditorEvent, EditorSnapshot};
use crate::error::SessionError;
use crate::view::{StepStrip, StepView};
use flowline_core::{EdgeId, NodeId, WorkflowId};
use flowline_workflow::{
    Edge, GraphError, HandlerRegistry, Node, NodeDraft, Position, Step, StepCursor,
    ValidationError, WorkflowGraph, WorkflowStore, from_records, sequence, to_records, validate,
};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// A change to the graph's structure or layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    AddNode {
        draft: NodeDraft,
    },
    Connect {
        source: NodeId,
        target: NodeId,
    },
    Move {
        node_id: NodeId,
        position: Position,
    },
    Rename {
        node_id: NodeId,
        name: String,
        description: String,
    },
    RemoveNode {
        node_id: NodeId,
    },
    RemoveEdge {
        edge_id: EdgeId,
    },
}

/// What an accepted edit did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum EditOutcome {
    NodeAdded(Node),
    EdgeAdded(Edge),
    NodeMoved,
    NodeRenamed,
    NodeRemoved(Node),
    EdgeRemoved(Edge),
}

/// The result of a successful load.
///
/// A graph that fails validation still loads; `issue` says what is wrong.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub node_count: usize,
    pub edge_count: usize,
    pub step_count: usize,
    pub issue: Option<ValidationError>,
}

/// The result of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub revision: u64,
    pub node_count: usize,
    pub edge_count: usize,
}

/// The result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Published {
    pub workflow_id: WorkflowId,
    pub step_count: usize,
}

/// A validation issue in a form the UI can show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueSummary {
    pub kind: &'static str,
    pub message: String,
}

impl From<&ValidationError> for IssueSummary {
    fn from(issue: &ValidationError) -> Self {
        Self {
            kind: issue.kind(),
            message: issue.to_string(),
        }
    }
}

/// Everything a client needs to draw the editor and the step page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub workflow_id: WorkflowId,
    pub editor: EditorSnapshot,
    pub steps: Vec<Step>,
    pub current_step: Option<usize>,
    pub view: Option<StepView>,
    pub strip: StepStrip,
    pub address: Option<String>,
    pub issue: Option<IssueSummary>,
    pub unsaved_changes: bool,
    /// The last load failed; saving is refused until a reload succeeds.
    pub needs_reload: bool,
    pub published: bool,
}

struct SessionState {
    graph: WorkflowGraph,
    steps: Vec<Step>,
    cursor: StepCursor,
    issue: Option<ValidationError>,
    revision: u64,
    saved_revision: u64,
    load_failed: bool,
    published: bool,
}

impl SessionState {
    fn new(graph: WorkflowGraph, registry: &HandlerRegistry) -> Self {
        let mut state = Self {
            graph,
            steps: Vec::new(),
            cursor: StepCursor::new(),
            issue: None,
            revision: 0,
            saved_revision: 0,
            load_failed: false,
            published: false,
        };
        state.rederive(registry);
        state
    }

    fn rederive(&mut self, registry: &HandlerRegistry) {
        self.steps = sequence(&self.graph, registry);
        self.cursor.reconcile(self.steps.len());
        self.issue = validate(&self.graph).err();
    }

    fn current(&self) -> Option<usize> {
        self.cursor.current(self.steps.len())
    }

    fn is_dirty(&self) -> bool {
        self.saved_revision != self.revision
    }

    fn apply(&mut self, op: EditOp) -> Result<EditOutcome, GraphError> {
        let graph = &mut self.graph;
        match op {
            EditOp::AddNode { draft } => Ok(EditOutcome::NodeAdded(graph.add_node(draft))),
            EditOp::Connect { source, target } => {
                graph.add_edge(&source, &target).map(EditOutcome::EdgeAdded)
            }
            EditOp::Move { node_id, position } => graph
                .move_node(&node_id, position)
                .map(|()| EditOutcome::NodeMoved),
            EditOp::Rename {
                node_id,
                name,
                description,
            } => graph
                .rename_node(&node_id, name, description)
                .map(|()| EditOutcome::NodeRenamed),
            EditOp::RemoveNode { node_id } => {
                graph.remove_node(&node_id).map(EditOutcome::NodeRemoved)
            }
            EditOp::RemoveEdge { edge_id } => {
                graph.remove_edge(&edge_id).map(EditOutcome::EdgeRemoved)
            }
        }
    }
}

/// An editing session over one workflow.
pub struct WorkflowSession {
    workflow_id: WorkflowId,
    store: Arc<dyn WorkflowStore>,
    registry: HandlerRegistry,
    state: Mutex<SessionState>,
    save_gate: tokio::sync::Mutex<()>,
    closed: AtomicBool,
}

impl WorkflowSession {
    /// Creates a session over an empty graph with the standard handlers.
    #[must_use]
    pub fn new(workflow_id: WorkflowId, store: Arc<dyn WorkflowStore>) -> Self {
        Self::with_registry(workflow_id, store, HandlerRegistry::standard())
    }

    /// Creates a session over an empty graph with a custom handler registry.
    #[must_use]
    pub fn with_registry(
        workflow_id: WorkflowId,
        store: Arc<dyn WorkflowStore>,
        registry: HandlerRegistry,
    ) -> Self {
        let state = SessionState::new(WorkflowGraph::new(workflow_id.clone()), &registry);
        Self {
            workflow_id,
            store,
            registry,
            state: Mutex::new(state),
            save_gate: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the workflow this session edits.
    #[must_use]
    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    /// Tears the session down. A load still in flight discards its result.
    pub fn close(&self) {
        // Taken so a load cannot swap its graph in between its closed check
        // and the flag flipping.
        let _state = self.state();
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(workflow_id = %self.workflow_id, "Session closed");
        }
    }

    /// Returns whether the session was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Replaces the live graph with the stored one.
    ///
    /// A graph that fails validation still loads, so it can be repaired;
    /// the failure is returned in the report. The cursor goes back to step 1.
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing is stored, `Store` for other storage failures,
    /// and `Closed` if the session was closed before or during the load.
    /// After a `Store` failure the session refuses to save until a later
    /// load succeeds, so the graph it holds never overwrites the stored one.
    #[instrument(skip(self), fields(workflow_id = %self.workflow_id))]
    pub async fn load(&self) -> Result<LoadReport, Report<SessionError>> {
        self.ensure_open()?;

        let fetched = self.store.fetch_graph(&self.workflow_id).await;
        if self.is_closed() {
            debug!("Session closed while loading; discarding result");
            return Err(SessionError::Closed.into());
        }

        let records = match fetched {
            Ok(records) => records,
            Err(report) => {
                let error = if report.current_context().is_not_found() {
                    SessionError::NotFound {
                        workflow_id: self.workflow_id.clone(),
                    }
                } else {
                    self.state().load_failed = true;
                    SessionError::Store {
                        workflow_id: self.workflow_id.clone(),
                        details: report.current_context().to_string(),
                    }
                };
                warn!(error = %error, "Failed to load workflow");
                return Err(report.context(error));
            }
        };

        let graph = from_records(self.workflow_id.clone(), records.nodes, records.edges);

        let mut state = self.state();
        if self.is_closed() {
            debug!("Session closed while loading; discarding result");
            return Err(SessionError::Closed.into());
        }
        state.graph = graph;
        state.load_failed = false;
        state.cursor = StepCursor::new();
        state.revision += 1;
        state.saved_revision = state.revision;
        state.published = false;
        state.rederive(&self.registry);

        let report = LoadReport {
            node_count: state.graph.node_count(),
            edge_count: state.graph.edge_count(),
            step_count: state.steps.len(),
            issue: state.issue.clone(),
        };
        match &report.issue {
            Some(issue) => warn!(
                issue = %issue,
                nodes = report.node_count,
                "Loaded workflow that needs repair"
            ),
            None => info!(
                nodes = report.node_count,
                edges = report.edge_count,
                "Loaded workflow"
            ),
        }
        Ok(report)
    }

    /// Loads, then moves to the step named by a deep link.
    ///
    /// A step outside the loaded range leaves the cursor on step 1.
    ///
    /// # Errors
    ///
    /// Same as [`WorkflowSession::load`].
    pub async fn load_at(&self, step: usize) -> Result<LoadReport, Report<SessionError>> {
        let report = self.load().await?;
        self.go_to_step(step);
        Ok(report)
    }

    /// Applies an edit and re-derives the steps.
    ///
    /// # Errors
    ///
    /// `Graph` if the edit names a node or edge that does not exist, and
    /// `Closed` after [`WorkflowSession::close`]. A rejected edit changes nothing.
    pub fn apply_edit(&self, op: EditOp) -> Result<EditOutcome, Report<SessionError>> {
        self.edit(|state| state.apply(op).map_err(SessionError::from))
    }

    /// Applies an event from the editor canvas.
    ///
    /// # Errors
    ///
    /// As [`WorkflowSession::apply_edit`], plus `FirstNodeMustBeTrigger`
    /// when a kind that cannot trigger is dropped onto an empty graph.
    pub fn handle_event(&self, event: EditorEvent) -> Result<EditOutcome, Report<SessionError>> {
        let op = match event {
            EditorEvent::NodeDropped {
                service,
                sub_service,
                position,
            } => {
                return self.edit(|state| {
                    if state.graph.is_empty() && !service.can_trigger() {
                        return Err(SessionError::FirstNodeMustBeTrigger { service });
                    }
                    let mut draft = NodeDraft::new(service);
                    draft.sub_service = sub_service;
                    draft.position = position;
                    state
                        .apply(EditOp::AddNode { draft })
                        .map_err(SessionError::from)
                });
            }
            EditorEvent::NodesConnected { source, target } => EditOp::Connect { source, target },
            EditorEvent::NodeMoved { node_id, position } => EditOp::Move { node_id, position },
            EditorEvent::NodeDeleted { node_id } => EditOp::RemoveNode { node_id },
            EditorEvent::EdgeDeleted { edge_id } => EditOp::RemoveEdge { edge_id },
        };
        self.apply_edit(op)
    }

    fn edit(
        &self,
        f: impl FnOnce(&mut SessionState) -> Result<EditOutcome, SessionError>,
    ) -> Result<EditOutcome, Report<SessionError>> {
        self.ensure_open()?;

        let mut state = self.state();
        match f(&mut *state) {
            Ok(outcome) => {
                state.revision += 1;
                state.published = false;
                state.rederive(&self.registry);
                debug!(
                    workflow_id = %self.workflow_id,
                    revision = state.revision,
                    steps = state.steps.len(),
                    "Applied edit"
                );
                Ok(outcome)
            }
            Err(error) => {
                debug!(workflow_id = %self.workflow_id, error = %error, "Rejected edit");
                Err(error.into())
            }
        }
    }

    /// Validates the live graph and writes it to the store.
    ///
    /// Saves run one at a time; a save issued while another is in flight
    /// waits for it and then writes the graph as it is at that point.
    ///
    /// # Errors
    ///
    /// `NotLoaded` if the last load failed, `Validation` if the graph is
    /// invalid (nothing is written), `Store` if the write fails (the live
    /// graph is kept for a retry), and `Closed`.
    #[instrument(skip(self), fields(workflow_id = %self.workflow_id))]
    pub async fn save(&self) -> Result<SaveReport, Report<SessionError>> {
        let _gate = self.save_gate.lock().await;
        self.ensure_open()?;

        let (records, revision) = {
            let state = self.state();
            if state.load_failed {
                warn!("Save refused; the workflow was never loaded");
                return Err(SessionError::NotLoaded {
                    workflow_id: self.workflow_id.clone(),
                }
                .into());
            }
            if let Err(issue) = validate(&state.graph) {
                warn!(issue = %issue, "Save blocked by validation");
                return Err(SessionError::Validation(issue).into());
            }
            (to_records(&state.graph), state.revision)
        };

        if let Err(report) = self.store.write_graph(&self.workflow_id, &records).await {
            let details = report.current_context().to_string();
            warn!(error = %details, revision, "Failed to save workflow");
            return Err(report.context(SessionError::Store {
                workflow_id: self.workflow_id.clone(),
                details,
            }));
        }

        let mut state = self.state();
        state.saved_revision = state.saved_revision.max(revision);

        info!(
            revision,
            nodes = records.nodes.len(),
            edges = records.edges.len(),
            "Saved workflow"
        );
        Ok(SaveReport {
            revision,
            node_count: records.nodes.len(),
            edge_count: records.edges.len(),
        })
    }

    /// Marks the workflow as published.
    ///
    /// Only allowed from the last step, with every edit saved and the graph
    /// valid.
    ///
    /// # Errors
    ///
    /// `IncompleteWorkflow`, `UnsavedChanges`, `Validation`,
    /// `NotOnFinalStep` or `Closed`, checked in that order.
    pub fn publish(&self) -> Result<Published, Report<SessionError>> {
        self.ensure_open()?;

        let mut state = self.state();
        let last = state.steps.len();
        if last == 0 {
            return Err(SessionError::IncompleteWorkflow.into());
        }
        if state.is_dirty() {
            return Err(SessionError::UnsavedChanges.into());
        }
        if let Some(issue) = &state.issue {
            return Err(SessionError::Validation(issue.clone()).into());
        }
        let current = state.current().unwrap_or(1);
        if current != last {
            return Err(SessionError::NotOnFinalStep { current, last }.into());
        }

        state.published = true;
        info!(workflow_id = %self.workflow_id, steps = last, "Published workflow");
        Ok(Published {
            workflow_id: self.workflow_id.clone(),
            step_count: last,
        })
    }

    /// Moves to step `n`. Out-of-range requests are ignored.
    ///
    /// Returns whether the current step changed.
    pub fn go_to_step(&self, n: usize) -> bool {
        let mut state = self.state();
        let len = state.steps.len();
        state.cursor.go_to(n, len)
    }

    /// Moves to the next step, if there is one.
    pub fn next(&self) -> bool {
        let mut state = self.state();
        let len = state.steps.len();
        state.cursor.next(len)
    }

    /// Moves to the previous step, if there is one.
    pub fn previous(&self) -> bool {
        let mut state = self.state();
        let len = state.steps.len();
        state.cursor.previous(len)
    }

    /// Returns the current 1-based step index, or `None` with no steps.
    #[must_use]
    pub fn current_step(&self) -> Option<usize> {
        self.state().current()
    }

    /// Returns the configuration view input for the current step.
    #[must_use]
    pub fn current_view(&self) -> Option<StepView> {
        let state = self.state();
        StepView::for_step(&state.steps, state.current()?)
    }

    /// Returns the deep link to the current step.
    #[must_use]
    pub fn address(&self) -> Option<StepAddress> {
        let step = self.current_step()?;
        Some(StepAddress::new(self.workflow_id.clone(), step))
    }

    /// Returns the derived steps.
    #[must_use]
    pub fn steps(&self) -> Vec<Step> {
        self.state().steps.clone()
    }

    /// Returns a copy of the live graph.
    #[must_use]
    pub fn graph(&self) -> WorkflowGraph {
        self.state().graph.clone()
    }

    /// Returns the current validation failure, if any.
    #[must_use]
    pub fn validation_issue(&self) -> Option<ValidationError> {
        self.state().issue.clone()
    }

    /// Returns whether the live graph differs from the last save or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.state().is_dirty()
    }

    /// Returns whether the workflow was published since the last edit.
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.state().published
    }

    /// Returns the render lists for the editor canvas.
    #[must_use]
    pub fn editor_snapshot(&self) -> EditorSnapshot {
        EditorSnapshot::from(&self.state().graph)
    }

    /// Returns the full client-facing state of the session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        let current = state.current();
        SessionSnapshot {
            workflow_id: self.workflow_id.clone(),
            editor: EditorSnapshot::from(&state.graph),
            steps: state.steps.clone(),
            current_step: current,
            view: current.and_then(|n| StepView::for_step(&state.steps, n)),
            strip: StepStrip::new(state.steps.len(), current),
            address: current
                .map(|n| StepAddress::new(self.workflow_id.clone(), n).to_string()),
            issue: state.issue.as_ref().map(IssueSummary::from),
            unsaved_changes: state.is_dirty(),
            needs_reload: state.load_failed,
            published: state.published,
        }
    }
}

//! Shared application state: the store and the open sessions.

use flowline_core::WorkflowId;
use flowline_session::WorkflowSession;
use flowline_workflow::WorkflowStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::ApiError;

/// One live session per workflow, over a shared store.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn WorkflowStore>,
    sessions: Arc<RwLock<HashMap<WorkflowId, Arc<WorkflowSession>>>>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self {
            store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    /// Returns the open session for a workflow, creating it if needed.
    pub async fn open(&self, workflow_id: &WorkflowId) -> Arc<WorkflowSession> {
        if let Some(session) = self.sessions.read().await.get(workflow_id) {
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(workflow_id.clone())
            .or_insert_with(|| {
                tracing::debug!(workflow_id = %workflow_id, "Opening session");
                Arc::new(WorkflowSession::new(
                    workflow_id.clone(),
                    self.store.clone(),
                ))
            })
            .clone()
    }

    /// Returns the open session for a workflow.
    ///
    /// # Errors
    ///
    /// Returns `NoSession` if the workflow has no open session.
    pub async fn session(&self, workflow_id: &WorkflowId) -> Result<Arc<WorkflowSession>, ApiError> {
        self.sessions
            .read()
            .await
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| ApiError::NoSession {
                workflow_id: workflow_id.clone(),
            })
    }

    /// Closes and forgets the session for a workflow.
    ///
    /// Returns whether a session was open.
    pub async fn close(&self, workflow_id: &WorkflowId) -> bool {
        let removed = self.sessions.write().await.remove(workflow_id);
        match removed {
            Some(session) => {
                session.close();
                true
            }
            None => false,
        }
    }

    /// Forgets `session` if it is still the one registered for its workflow.
    pub async fn discard(&self, session: &Arc<WorkflowSession>) {
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(session.workflow_id())
            .is_some_and(|open| Arc::ptr_eq(open, session))
        {
            sessions.remove(session.workflow_id());
            session.close();
        }
    }

    /// Returns the number of open sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowline_store::MemoryStore;

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn open_reuses_existing_session() {
        let state = state();
        let id = WorkflowId::new("wf-1");

        let first = state.open(&id).await;
        let second = state.open(&id).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(state.session_count().await, 1);
    }

    #[tokio::test]
    async fn close_marks_session_closed() {
        let state = state();
        let id = WorkflowId::new("wf-1");
        let session = state.open(&id).await;

        assert!(state.close(&id).await);
        assert!(session.is_closed());
        assert!(!state.close(&id).await);
        assert!(matches!(
            state.session(&id).await,
            Err(ApiError::NoSession { .. })
        ));
    }

    #[tokio::test]
    async fn discard_ignores_replaced_session() {
        let state = state();
        let id = WorkflowId::new("wf-1");
        let stale = state.open(&id).await;
        state.close(&id).await;
        let fresh = state.open(&id).await;

        state.discard(&stale).await;

        assert!(Arc::ptr_eq(&state.session(&id).await.unwrap(), &fresh));
    }
}

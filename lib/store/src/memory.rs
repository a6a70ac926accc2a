//! In-memory workflow store.

use async_trait::async_trait;
use flowline_core::WorkflowId;
use flowline_workflow::{GraphRecords, StoreError, WorkflowStore};
use rootcause::Report;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// A store that keeps records in a process-local map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    graphs: RwLock<HashMap<WorkflowId, GraphRecords>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the records for a workflow, replacing any existing ones.
    pub async fn insert(&self, workflow_id: WorkflowId, records: GraphRecords) {
        self.graphs.write().await.insert(workflow_id, records);
    }

    /// Returns the stored records for a workflow, if any.
    pub async fn get(&self, workflow_id: &WorkflowId) -> Option<GraphRecords> {
        self.graphs.read().await.get(workflow_id).cloned()
    }

    /// Returns the number of stored workflows.
    pub async fn len(&self) -> usize {
        self.graphs.read().await.len()
    }

    /// Returns whether no workflows are stored.
    pub async fn is_empty(&self) -> bool {
        self.graphs.read().await.is_empty()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn fetch_graph(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<GraphRecords, Report<StoreError>> {
        let records = self.get(workflow_id).await.ok_or_else(|| StoreError::NotFound {
            workflow_id: workflow_id.clone(),
        })?;
        debug!(
            workflow_id = %workflow_id,
            nodes = records.nodes.len(),
            edges = records.edges.len(),
            "Fetched workflow graph from memory"
        );
        Ok(records)
    }

    async fn write_graph(
        &self,
        workflow_id: &WorkflowId,
        records: &GraphRecords,
    ) -> Result<(), Report<StoreError>> {
        self.insert(workflow_id.clone(), records.clone()).await;
        debug!(workflow_id = %workflow_id, "Wrote workflow graph to memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowline_core::{EdgeId, NodeId};
    use flowline_workflow::EdgeRecord;

    #[tokio::test]
    async fn missing_workflow_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .fetch_graph(&WorkflowId::new("wf-missing"))
            .await
            .unwrap_err();
        assert!(err.current_context().is_not_found());
    }

    #[tokio::test]
    async fn write_replaces_previous_records() {
        let store = MemoryStore::new();
        let id = WorkflowId::new("wf-1");
        let edge = EdgeRecord {
            id: EdgeId::new("e1"),
            source_id: NodeId::new("a"),
            target_id: NodeId::new("b"),
        };

        store
            .write_graph(&id, &GraphRecords::new(Vec::new(), vec![edge]))
            .await
            .unwrap();
        store.write_graph(&id, &GraphRecords::default()).await.unwrap();

        let fetched = store.fetch_graph(&id).await.unwrap();
        assert!(fetched.is_empty());
        assert_eq!(store.len().await, 1);
    }
}

//! The workflow store contract.
//!
//! A store persists the flat records of one graph per workflow. Writes
//! replace the whole record set. There is no version check between
//! concurrent writers; the last write wins.

use crate::error::StoreError;
use crate::record::GraphRecords;
use async_trait::async_trait;
use flowline_core::{Result, WorkflowId};

/// Durable storage for workflow graphs.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Fetches the records stored for a workflow.
    ///
    /// Fails with `StoreError::NotFound` if nothing is stored for it.
    async fn fetch_graph(&self, workflow_id: &WorkflowId) -> Result<GraphRecords, StoreError>;

    /// Replaces the records stored for a workflow.
    async fn write_graph(
        &self,
        workflow_id: &WorkflowId,
        records: &GraphRecords,
    ) -> Result<(), StoreError>;
}

//! JSON file workflow store.
//!
//! Each workflow is one document at `<root>/<workflow_id>.json`. Writes go
//! to a uniquely named sibling temp file first and are renamed into place,
//! so a reader never sees a half-written document and concurrent writers
//! never share a temp file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowline_core::WorkflowId;
use flowline_workflow::{GraphRecords, StoreError, WorkflowStore};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};
use ulid::Ulid;

/// The on-disk document for one workflow.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredGraph {
    workflow_id: WorkflowId,
    saved_at: DateTime<Utc>,
    #[serde(flatten)]
    records: GraphRecords,
}

/// A store backed by a directory of JSON documents.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the store's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, workflow_id: &WorkflowId) -> Result<PathBuf, StoreError> {
        let id = workflow_id.as_str();
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
            return Err(StoreError::Io {
                details: format!("workflow id '{id}' cannot be used as a file name"),
            });
        }
        Ok(self.root.join(format!("{id}.json")))
    }
}

#[async_trait]
impl WorkflowStore for FileStore {
    #[instrument(skip(self), fields(workflow_id = %workflow_id))]
    async fn fetch_graph(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<GraphRecords, Report<StoreError>> {
        let path = self.path_for(workflow_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    workflow_id: workflow_id.clone(),
                }
                .into());
            }
            Err(e) => {
                return Err(StoreError::Io {
                    details: format!("reading {}: {e}", path.display()),
                }
                .into());
            }
        };

        let stored: StoredGraph =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
                details: format!("{}: {e}", path.display()),
            })?;

        debug!(
            nodes = stored.records.nodes.len(),
            edges = stored.records.edges.len(),
            saved_at = %stored.saved_at,
            "Loaded workflow document"
        );
        Ok(stored.records)
    }

    #[instrument(skip(self, records), fields(workflow_id = %workflow_id))]
    async fn write_graph(
        &self,
        workflow_id: &WorkflowId,
        records: &GraphRecords,
    ) -> Result<(), Report<StoreError>> {
        let path = self.path_for(workflow_id)?;
        let stored = StoredGraph {
            workflow_id: workflow_id.clone(),
            saved_at: Utc::now(),
            records: records.clone(),
        };
        let bytes =
            serde_json::to_vec_pretty(&stored).map_err(|e| StoreError::Serialization {
                details: e.to_string(),
            })?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::Io {
                details: format!("creating {}: {e}", self.root.display()),
            })?;

        let tmp = path.with_extension(format!("json.{}.tmp", Ulid::new()));
        let written = match tokio::fs::write(&tmp, &bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, &path)
                .await
                .map_err(|e| format!("renaming into {}: {e}", path.display())),
            Err(e) => Err(format!("writing {}: {e}", tmp.display())),
        };
        if let Err(details) = written {
            match tokio::fs::remove_file(&tmp).await {
                Err(e) if e.kind() != ErrorKind::NotFound => {
                    warn!(path = %tmp.display(), error = %e, "Failed to remove temp file");
                }
                _ => {}
            }
            return Err(StoreError::Io { details }.into());
        }

        debug!(bytes = bytes.len(), "Wrote workflow document");
        Ok(())
    }
}

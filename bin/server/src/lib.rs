//! HTTP shell for flowline.
//!
//! Serves workflow editing sessions over JSON routes. The store behind the
//! sessions is picked by [`config::StoreConfig`].

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use config::StoreConfig;
use error::ServerError;
use flowline_store::{FileStore, MemoryStore};
use flowline_workflow::WorkflowStore;
use rootcause::Report;
use std::sync::Arc;

/// Opens the store named by the configuration.
///
/// # Errors
///
/// Returns `ServerError::Store` if the store cannot be reached, or if
/// PostgreSQL is configured in a build without the `postgres` feature.
pub async fn build_store(
    config: &StoreConfig,
) -> Result<Arc<dyn WorkflowStore>, Report<ServerError>> {
    match config {
        StoreConfig::Memory => {
            tracing::warn!("Using in-memory store; workflows are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreConfig::File { root } => {
            tracing::info!(root = %root.display(), "Using file store");
            Ok(Arc::new(FileStore::new(root.clone())))
        }
        #[cfg(feature = "postgres")]
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let store = flowline_store::PgStore::connect(database_url, *max_connections)
                .await
                .map_err(|report| {
                    let details = report.current_context().to_string();
                    report.context(ServerError::Store { details })
                })?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        StoreConfig::Postgres { .. } => Err(ServerError::Store {
            details: "built without the postgres feature".to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowline_core::WorkflowId;

    #[tokio::test]
    async fn file_store_is_built_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = build_store(&StoreConfig::File {
            root: dir.path().to_path_buf(),
        })
        .await
        .unwrap();

        let err = store
            .fetch_graph(&WorkflowId::new("wf_absent"))
            .await
            .unwrap_err();
        assert!(err.current_context().is_not_found());
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn postgres_requires_feature() {
        let result = build_store(&StoreConfig::Postgres {
            database_url: "postgres://localhost/flowline".to_string(),
            max_connections: 1,
        })
        .await;
        assert!(matches!(
            result.map(|_| ()).unwrap_err().current_context(),
            ServerError::Store { .. }
        ));
    }
}

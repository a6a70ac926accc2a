//! PostgreSQL workflow store.
//!
//! Nodes and edges live in their own tables keyed by workflow id, with an
//! `ordinal` column so records come back in the order they were written.
//! A write replaces both sets inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowline_core::{EdgeId, NodeId, WorkflowId};
use flowline_workflow::{
    EdgeRecord, GraphRecords, NodeRecord, NodeRole, ServiceKind, StoreError, SubService,
    WorkflowStore,
};
use rootcause::Report;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info, instrument};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS workflow_graphs (
        workflow_id TEXT PRIMARY KEY,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS workflow_nodes (
        workflow_id TEXT NOT NULL REFERENCES workflow_graphs (workflow_id) ON DELETE CASCADE,
        ordinal BIGINT NOT NULL,
        id TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        service TEXT NOT NULL,
        sub_service TEXT,
        role TEXT NOT NULL,
        position_x DOUBLE PRECISION NOT NULL,
        position_y DOUBLE PRECISION NOT NULL,
        PRIMARY KEY (workflow_id, id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS workflow_edges (
        workflow_id TEXT NOT NULL REFERENCES workflow_graphs (workflow_id) ON DELETE CASCADE,
        ordinal BIGINT NOT NULL,
        id TEXT NOT NULL,
        source_id TEXT NOT NULL,
        target_id TEXT NOT NULL,
        PRIMARY KEY (workflow_id, id)
    )
    "#,
];

/// Row type for node queries.
#[derive(FromRow)]
struct NodeRow {
    id: String,
    name: String,
    description: String,
    service: String,
    sub_service: Option<String>,
    role: String,
    position_x: f64,
    position_y: f64,
}

impl NodeRow {
    fn try_into_record(self) -> Result<NodeRecord, StoreError> {
        let role = NodeRole::from_name(&self.role).ok_or_else(|| StoreError::Serialization {
            details: format!("node '{}' has unknown role '{}'", self.id, self.role),
        })?;
        Ok(NodeRecord {
            id: NodeId::from(self.id),
            name: self.name,
            description: self.description,
            service: ServiceKind::from(self.service),
            sub_service: self.sub_service.map(SubService::from),
            role,
            position_x: self.position_x,
            position_y: self.position_y,
        })
    }
}

/// Row type for edge queries.
#[derive(FromRow)]
struct EdgeRow {
    id: String,
    source_id: String,
    target_id: String,
}

impl From<EdgeRow> for EdgeRecord {
    fn from(row: EdgeRow) -> Self {
        Self {
            id: EdgeId::from(row.id),
            source_id: NodeId::from(row.source_id),
            target_id: NodeId::from(row.target_id),
        }
    }
}

/// Reads of one graph see a single snapshot, so a concurrent save cannot
/// mix old nodes with new edges.
const SNAPSHOT_READ: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

fn database_error(e: sqlx::Error) -> StoreError {
    StoreError::Database {
        details: e.to_string(),
    }
}

/// A store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and makes sure the tables exist.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, Report<StoreError>> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(database_error)?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        info!(max_connections, "Connected to workflow database");
        Ok(store)
    }

    /// Creates the workflow tables if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), Report<StoreError>> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(database_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for PgStore {
    #[instrument(skip(self), fields(workflow_id = %workflow_id))]
    async fn fetch_graph(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<GraphRecords, Report<StoreError>> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;
        sqlx::query(SNAPSHOT_READ)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        let updated_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT updated_at FROM workflow_graphs WHERE workflow_id = $1",
        )
        .bind(workflow_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(database_error)?;

        let Some(updated_at) = updated_at else {
            return Err(StoreError::NotFound {
                workflow_id: workflow_id.clone(),
            }
            .into());
        };

        let node_rows: Vec<NodeRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, service, sub_service, role, position_x, position_y
            FROM workflow_nodes
            WHERE workflow_id = $1
            ORDER BY ordinal
            "#,
        )
        .bind(workflow_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(database_error)?;

        let edge_rows: Vec<EdgeRow> = sqlx::query_as(
            r#"
            SELECT id, source_id, target_id
            FROM workflow_edges
            WHERE workflow_id = $1
            ORDER BY ordinal
            "#,
        )
        .bind(workflow_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(database_error)?;
        tx.commit().await.map_err(database_error)?;

        let nodes = node_rows
            .into_iter()
            .map(NodeRow::try_into_record)
            .collect::<Result<Vec<_>, _>>()?;
        let edges = edge_rows.into_iter().map(EdgeRecord::from).collect();

        debug!(%updated_at, "Fetched workflow graph from database");
        Ok(GraphRecords::new(nodes, edges))
    }

    #[instrument(skip(self, records), fields(workflow_id = %workflow_id))]
    async fn write_graph(
        &self,
        workflow_id: &WorkflowId,
        records: &GraphRecords,
    ) -> Result<(), Report<StoreError>> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        sqlx::query(
            r#"
            INSERT INTO workflow_graphs (workflow_id, updated_at)
            VALUES ($1, $2)
            ON CONFLICT (workflow_id) DO UPDATE SET updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(workflow_id.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(database_error)?;

        for statement in [
            "DELETE FROM workflow_edges WHERE workflow_id = $1",
            "DELETE FROM workflow_nodes WHERE workflow_id = $1",
        ] {
            sqlx::query(statement)
                .bind(workflow_id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;
        }

        for (ordinal, node) in (0_i64..).zip(&records.nodes) {
            sqlx::query(
                r#"
                INSERT INTO workflow_nodes
                    (workflow_id, ordinal, id, name, description, service, sub_service, role, position_x, position_y)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(workflow_id.as_str())
            .bind(ordinal)
            .bind(node.id.as_str())
            .bind(&node.name)
            .bind(&node.description)
            .bind(node.service.as_str())
            .bind(node.sub_service.as_ref().map(SubService::as_str))
            .bind(node.role.as_str())
            .bind(node.position_x)
            .bind(node.position_y)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;
        }

        for (ordinal, edge) in (0_i64..).zip(&records.edges) {
            sqlx::query(
                r#"
                INSERT INTO workflow_edges (workflow_id, ordinal, id, source_id, target_id)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(workflow_id.as_str())
            .bind(ordinal)
            .bind(edge.id.as_str())
            .bind(edge.source_id.as_str())
            .bind(edge.target_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;
        }

        tx.commit().await.map_err(database_error)?;

        debug!(
            nodes = records.nodes.len(),
            edges = records.edges.len(),
            "Wrote workflow graph to database"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_row_maps_to_record() {
        let row = NodeRow {
            id: "n1".to_string(),
            name: "Gmail".to_string(),
            description: String::new(),
            service: "Google".to_string(),
            sub_service: Some("GoogleMail".to_string()),
            role: "Trigger".to_string(),
            position_x: 1.0,
            position_y: 2.0,
        };
        let record = row.try_into_record().expect("valid row");
        assert_eq!(record.service, ServiceKind::Google);
        assert_eq!(record.sub_service, Some(SubService::GoogleMail));
        assert_eq!(record.role, NodeRole::Trigger);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let row = NodeRow {
            id: "n1".to_string(),
            name: String::new(),
            description: String::new(),
            service: "Google".to_string(),
            sub_service: None,
            role: "Observer".to_string(),
            position_x: 0.0,
            position_y: 0.0,
        };
        assert!(matches!(
            row.try_into_record(),
            Err(StoreError::Serialization { .. })
        ));
    }

    #[test]
    fn graph_reads_share_one_snapshot() {
        assert!(SNAPSHOT_READ.starts_with("SET TRANSACTION"));
        assert!(SNAPSHOT_READ.contains("REPEATABLE READ"));
        assert!(SNAPSHOT_READ.contains("READ ONLY"));
    }

    fn chain(len: usize) -> GraphRecords {
        let nodes = (0..len)
            .map(|i| NodeRecord {
                id: NodeId::new(format!("n{i}")),
                name: format!("Step {i}"),
                description: String::new(),
                service: ServiceKind::Github,
                sub_service: None,
                role: if i == 0 {
                    NodeRole::Trigger
                } else {
                    NodeRole::Action
                },
                position_x: 0.0,
                position_y: 0.0,
            })
            .collect();
        let edges = (1..len)
            .map(|i| EdgeRecord {
                id: EdgeId::new(format!("e{i}")),
                source_id: NodeId::new(format!("n{}", i - 1)),
                target_id: NodeId::new(format!("n{i}")),
            })
            .collect();
        GraphRecords::new(nodes, edges)
    }

    /// Runs against `FLOWLINE_TEST_DATABASE_URL` when set.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reads_never_mix_two_saves() {
        let Ok(url) = std::env::var("FLOWLINE_TEST_DATABASE_URL") else {
            return;
        };
        let store = PgStore::connect(&url, 4).await.unwrap();
        let id = WorkflowId::generate();
        store.write_graph(&id, &chain(1)).await.unwrap();

        let writer = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move {
                for round in 0..50 {
                    let len = if round % 2 == 0 { 4 } else { 1 };
                    store.write_graph(&id, &chain(len)).await.unwrap();
                }
            })
        };
        for _ in 0..50 {
            let records = store.fetch_graph(&id).await.unwrap();
            assert_eq!(records.edges.len() + 1, records.nodes.len());
        }
        writer.await.unwrap();
    }
}

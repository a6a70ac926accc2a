//! Workflow graph engine for flowline.
//!
//! This crate models an automation as a graph of trigger and action nodes
//! and turns it into a linear list of steps:
//!
//! - **Model**: nodes, edges and the editable [`WorkflowGraph`]
//! - **Validation**: the single-trigger, single-path contract
//! - **Sequencing**: ordered steps with per-type handler resolution
//! - **Records**: the flat shape the [`WorkflowStore`] persists

pub mod edge;
pub mod error;
pub mod graph;
pub mod handler;
pub mod node;
pub mod record;
pub mod sequence;
pub mod store;
pub mod validate;

pub use edge::Edge;
pub use error::{GraphError, StoreError, TriggerIssue, ValidationError};
pub use graph::{Topology, WorkflowGraph};
pub use handler::{HandlerKey, HandlerKind, HandlerRegistry};
pub use node::{Node, NodeDraft, NodeRole, Position, ServiceKind, SubService};
pub use record::{EdgeRecord, GraphRecords, NodeRecord, from_records, to_records};
pub use sequence::{Step, StepCursor, StepHandler, UnhandledNodeType, execution_order, sequence};
pub use store::WorkflowStore;
pub use validate::validate;

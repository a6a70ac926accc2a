//! Core domain types shared by the flowline crates.
//!
//! Provides the opaque identifier types for workflows, nodes and edges, and
//! the `Result` alias used at I/O boundaries.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{EdgeId, NodeId, WorkflowId};

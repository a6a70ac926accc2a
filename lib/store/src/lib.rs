//! Workflow store implementations.
//!
//! - [`MemoryStore`]: process-local, for tests and throwaway sessions
//! - [`FileStore`]: one JSON document per workflow in a directory
//! - `PgStore` (feature `postgres`): node and edge tables in PostgreSQL

pub mod file;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

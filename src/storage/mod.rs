//! Storage backends for resources, subscribers and the escalation journal
//!
//! The pipeline never owns resource or subscriber records. It reads them through
//! [`StorageBackend`] at the moment of use (every probe tick, every escalation)
//! and only ever appends to the journal.
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database, shares its pool with the durable
//!   notification queue
//! - **In-Memory**: No persistence, for testing or dry runs
//!
//! ## Usage
//!
//! ```no_run
//! use pingwatch::storage::{StorageBackend, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./pingwatch.db").await?;
//!     let resources = backend.list_resources().await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, StorageBackend};
pub use error::{StorageError, StorageResult};

//! Storage backend trait definition
//!
//! This is the persistence collaborator as seen from the pipeline: two snapshot
//! reads and one append. Record management (adding resources, subscribing) lives
//! outside the pipeline; backends only offer inherent seeding helpers for it.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StorageResult;
use crate::{JournalEntry, ResourceDescriptor};

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Trait for persistence backends
///
/// ## Snapshots
///
/// `list_resources` and `list_active_subscribers` each return a point-in-time
/// copy read in a single statement. Callers must not cache the result across a
/// retry cycle; the scheduler and the escalation handler read fresh every time.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` as many retry machines escalate
/// concurrently.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Chat identifiers of every active subscriber
    async fn list_active_subscribers(&self) -> StorageResult<Vec<String>>;

    /// All monitored resources
    async fn list_resources(&self) -> StorageResult<Vec<ResourceDescriptor>>;

    /// Append one journal entry
    ///
    /// A single-row insert; concurrent appends never interleave.
    async fn append_journal_entry(
        &self,
        resource_id: i64,
        created_at: DateTime<Utc>,
    ) -> StorageResult<JournalEntry>;

    /// The most recent journal entries, newest first
    ///
    /// Filtered to one resource when `resource_id` is given.
    async fn list_journal(
        &self,
        resource_id: Option<i64>,
        limit: usize,
    ) -> StorageResult<Vec<JournalEntry>>;

    /// Check backend health
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}

//! In-memory storage backend (no persistence)
//!
//! Useful for:
//! - Testing without database dependencies
//! - Dry runs (`"storage": { "backend": "none" }`)
//!
//! ## Limitations
//!
//! - **No persistence**: journal and records are lost on restart

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, StorageBackend};
use super::error::StorageResult;
use crate::{JournalEntry, ResourceAddress, ResourceDescriptor, Subscriber};

#[derive(Debug, Default)]
struct State {
    resources: Vec<ResourceDescriptor>,
    subscribers: Vec<Subscriber>,
    journal: Vec<JournalEntry>,
    next_resource_id: i64,
    next_journal_id: i64,
}

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource and return it with its assigned id
    pub async fn insert_resource(
        &self,
        address: ResourceAddress,
        name: &str,
    ) -> StorageResult<ResourceDescriptor> {
        let mut state = self.state.write().await;
        state.next_resource_id += 1;
        let resource = ResourceDescriptor {
            id: state.next_resource_id,
            address,
            name: name.to_string(),
        };
        state.resources.push(resource.clone());
        Ok(resource)
    }

    /// Remove a resource. Its journal entries are kept.
    pub async fn remove_resource(&self, id: i64) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        let before = state.resources.len();
        state.resources.retain(|resource| resource.id != id);
        Ok(state.resources.len() != before)
    }

    /// Create the subscriber if unknown, then set its active flag
    pub async fn set_subscriber_active(&self, chat_id: &str, active: bool) -> StorageResult<()> {
        let mut state = self.state.write().await;
        match state
            .subscribers
            .iter_mut()
            .find(|subscriber| subscriber.chat_id == chat_id)
        {
            Some(subscriber) => subscriber.active = active,
            None => state.subscribers.push(Subscriber {
                chat_id: chat_id.to_string(),
                active,
            }),
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn list_active_subscribers(&self) -> StorageResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.active)
            .map(|subscriber| subscriber.chat_id.clone())
            .collect())
    }

    async fn list_resources(&self) -> StorageResult<Vec<ResourceDescriptor>> {
        Ok(self.state.read().await.resources.clone())
    }

    async fn append_journal_entry(
        &self,
        resource_id: i64,
        created_at: DateTime<Utc>,
    ) -> StorageResult<JournalEntry> {
        let mut state = self.state.write().await;
        state.next_journal_id += 1;
        let entry = JournalEntry {
            id: state.next_journal_id,
            resource_id,
            created_at,
        };
        state.journal.push(entry.clone());
        debug!("journal entry {} for resource {}", entry.id, resource_id);
        Ok(entry)
    }

    async fn list_journal(
        &self,
        resource_id: Option<i64>,
        limit: usize,
    ) -> StorageResult<Vec<JournalEntry>> {
        let state = self.state.read().await;
        Ok(state
            .journal
            .iter()
            .rev()
            .filter(|entry| resource_id.is_none_or(|id| entry.resource_id == id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let state = self.state.read().await;
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("resources".to_string(), state.resources.len().to_string()),
                ("journal_entries".to_string(), state.journal.len().to_string()),
            ]),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}

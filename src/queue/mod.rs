//! Notification queue between escalation and delivery
//!
//! A FIFO that many escalation handlers push into concurrently and a single
//! delivery consumer drains. Two ways to take a message out:
//!
//! - [`NotificationQueue::pop`] removes the head in one atomic step
//! - [`NotificationQueue::claim`] + [`NotificationQueue::ack`] read the head and
//!   remove it only after it was handled
//!
//! The delivery consumer uses claim/ack, which makes delivery at-least-once: a
//! crash between send and ack leaves the message at the head for the next drain.

use async_trait::async_trait;

use crate::storage::StorageResult;
use crate::{NotificationMessage, QueuedMessage};

pub mod memory;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use memory::MemoryQueue;

#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Append a message at the tail
    async fn push(&self, message: NotificationMessage) -> StorageResult<()>;

    /// Remove and return the head, if any
    async fn pop(&self) -> StorageResult<Option<NotificationMessage>>;

    /// Return the head without removing it
    async fn claim(&self) -> StorageResult<Option<QueuedMessage>>;

    /// Remove a previously claimed message
    ///
    /// Acknowledging an id that is no longer queued is a no-op.
    async fn ack(&self, id: i64) -> StorageResult<()>;

    /// Number of queued messages
    async fn len(&self) -> StorageResult<usize>;

    async fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len().await? == 0)
    }
}

//! Process-local queue, lost on restart

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::NotificationQueue;
use crate::storage::StorageResult;
use crate::{NotificationMessage, QueuedMessage};

#[derive(Debug, Default)]
struct Inner {
    messages: VecDeque<QueuedMessage>,
    next_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryQueue {
    inner: Mutex<Inner>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationQueue for MemoryQueue {
    async fn push(&self, message: NotificationMessage) -> StorageResult<()> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.messages.push_back(QueuedMessage { id, message });
        Ok(())
    }

    async fn pop(&self) -> StorageResult<Option<NotificationMessage>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.messages.pop_front().map(|queued| queued.message))
    }

    async fn claim(&self) -> StorageResult<Option<QueuedMessage>> {
        let inner = self.inner.lock().await;
        Ok(inner.messages.front().cloned())
    }

    async fn ack(&self, id: i64) -> StorageResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.messages.front().is_some_and(|queued| queued.id == id) {
            inner.messages.pop_front();
        } else {
            inner.messages.retain(|queued| queued.id != id);
        }
        Ok(())
    }

    async fn len(&self) -> StorageResult<usize> {
        Ok(self.inner.lock().await.messages.len())
    }
}

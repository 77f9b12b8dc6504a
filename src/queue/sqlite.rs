//! Durable queue backed by the `notification_queue` table
//!
//! Each operation is a single SQL statement and therefore atomic. Ids come from
//! `AUTOINCREMENT`, so they never go backwards and `ORDER BY id` is push order.
//! Messages survive producer and consumer restarts.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use tracing::{instrument, trace};

use super::NotificationQueue;
use crate::storage::StorageResult;
use crate::storage::sqlite::SqliteBackend;
use crate::{NotificationMessage, QueuedMessage};

#[derive(Clone)]
pub struct SqliteQueue {
    pool: Pool<Sqlite>,
}

impl SqliteQueue {
    pub(crate) fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationQueue for SqliteQueue {
    #[instrument(skip(self, message), fields(destination = %message.destination))]
    async fn push(&self, message: NotificationMessage) -> StorageResult<()> {
        let enqueued_at = SqliteBackend::timestamp_to_millis(&Utc::now());
        let result = sqlx::query(
            "INSERT INTO notification_queue (destination, body, enqueued_at) VALUES (?, ?, ?)",
        )
        .bind(&message.destination)
        .bind(&message.body)
        .bind(enqueued_at)
        .execute(&self.pool)
        .await?;

        trace!("queued message {}", result.last_insert_rowid());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn pop(&self) -> StorageResult<Option<NotificationMessage>> {
        let row = sqlx::query(
            r#"
            DELETE FROM notification_queue
            WHERE id = (SELECT MIN(id) FROM notification_queue)
            RETURNING destination, body
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| NotificationMessage {
            destination: row.get("destination"),
            body: row.get("body"),
        }))
    }

    #[instrument(skip(self))]
    async fn claim(&self) -> StorageResult<Option<QueuedMessage>> {
        let row = sqlx::query(
            "SELECT id, destination, body FROM notification_queue ORDER BY id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| QueuedMessage {
            id: row.get("id"),
            message: NotificationMessage {
                destination: row.get("destination"),
                body: row.get("body"),
            },
        }))
    }

    #[instrument(skip(self))]
    async fn ack(&self, id: i64) -> StorageResult<()> {
        sqlx::query("DELETE FROM notification_queue WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn len(&self) -> StorageResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notification_queue")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

//! SQLite storage backend implementation
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Snapshot reads don't block the journal and queue writers
//! - **Connection pooling**: Shared with [`crate::queue::sqlite::SqliteQueue`]
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! Every read the pipeline performs is a single statement, so it observes one
//! consistent snapshot of the table.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use crate::queue::sqlite::SqliteQueue;
use crate::{JournalEntry, ResourceAddress, ResourceDescriptor};

/// SQLite storage backend
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Create a new SQLite backend
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables
    /// 3. Configure SQLite for concurrent access (WAL mode, busy timeout)
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    /// Durable notification queue sharing this backend's pool
    pub fn queue(&self) -> SqliteQueue {
        SqliteQueue::new(self.pool.clone())
    }

    /// Add a resource and return it with its assigned id
    #[instrument(skip(self))]
    pub async fn insert_resource(
        &self,
        address: ResourceAddress,
        name: &str,
    ) -> StorageResult<ResourceDescriptor> {
        let result = sqlx::query("INSERT INTO resources (address, name) VALUES (?, ?)")
            .bind(address.to_string())
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(ResourceDescriptor {
            id: result.last_insert_rowid(),
            address,
            name: name.to_string(),
        })
    }

    /// Remove a resource. Its journal entries are kept.
    #[instrument(skip(self))]
    pub async fn remove_resource(&self, id: i64) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM resources WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Create the subscriber if unknown, then set its active flag
    #[instrument(skip(self))]
    pub async fn set_subscriber_active(&self, chat_id: &str, active: bool) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (chat, active) VALUES (?, ?)
            ON CONFLICT (chat) DO UPDATE SET active = excluded.active
            "#,
        )
        .bind(chat_id)
        .bind(active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Helper to convert timestamp to Unix milliseconds for SQLite
    pub(crate) fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    /// Helper to convert Unix milliseconds from SQLite to DateTime
    pub(crate) fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip(self))]
    async fn list_active_subscribers(&self) -> StorageResult<Vec<String>> {
        let rows = sqlx::query("SELECT chat FROM users WHERE active = 1 ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.get("chat")).collect())
    }

    #[instrument(skip(self))]
    async fn list_resources(&self) -> StorageResult<Vec<ResourceDescriptor>> {
        let rows = sqlx::query("SELECT id, address, name FROM resources ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut resources = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.get("id");
            let address: String = row.get("address");
            let name: String = row.get("name");

            // a bad row must not hide every other resource from the tick
            match ResourceDescriptor::new(id, &address, name) {
                Ok(resource) => resources.push(resource),
                Err(e) => warn!("skipping resource {id}: {e}"),
            }
        }

        debug!("loaded {} resources", resources.len());
        Ok(resources)
    }

    #[instrument(skip(self))]
    async fn append_journal_entry(
        &self,
        resource_id: i64,
        created_at: DateTime<Utc>,
    ) -> StorageResult<JournalEntry> {
        let result = sqlx::query("INSERT INTO journal (resource, created_at) VALUES (?, ?)")
            .bind(resource_id)
            .bind(Self::timestamp_to_millis(&created_at))
            .execute(&self.pool)
            .await?;

        Ok(JournalEntry {
            id: result.last_insert_rowid(),
            resource_id,
            // stored with millisecond precision
            created_at: Self::millis_to_timestamp(Self::timestamp_to_millis(&created_at)),
        })
    }

    #[instrument(skip(self))]
    async fn list_journal(
        &self,
        resource_id: Option<i64>,
        limit: usize,
    ) -> StorageResult<Vec<JournalEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = match resource_id {
            Some(resource_id) => {
                sqlx::query(
                    r#"
                    SELECT id, resource, created_at FROM journal
                    WHERE resource = ?
                    ORDER BY id DESC
                    LIMIT ?
                    "#,
                )
                .bind(resource_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, resource, created_at FROM journal ORDER BY id DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|row| JournalEntry {
                id: row.get("id"),
                resource_id: row.get("resource"),
                created_at: Self::millis_to_timestamp(row.get("created_at")),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => Ok(HealthStatus {
                healthy: true,
                message: "SQLite backend operational".to_string(),
                metadata: HashMap::from([
                    ("backend".to_string(), "sqlite".to_string()),
                    ("db_path".to_string(), self.db_path.clone()),
                ]),
            }),
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}

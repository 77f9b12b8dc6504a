//! EscalationHandler - Turns an exhausted retry cycle into a journal entry and alerts
//!
//! ## Side Effects
//!
//! ```text
//! escalate(resource) ─┬─> journal append (one row)
//!                     └─> fresh subscriber read ─> one queued message per subscriber
//! ```
//!
//! The two branches are independent: a failed journal append does not keep
//! subscribers from being notified, and a failed push does not undo the journal.
//! Every failure is logged and reflected in the [`EscalationReport`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, instrument, warn};

use crate::NotificationMessage;
use crate::queue::NotificationQueue;
use crate::storage::StorageBackend;

use super::messages::EscalationReport;

/// Human-readable alert text
pub fn format_alert(resource_name: &str, attempts: u32, at: DateTime<Utc>) -> String {
    format!(
        "🔴 Resource {resource_name} is unreachable after {attempts} attempts. Time: {}.",
        at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Shared by every retry machine; cheap to clone
#[derive(Clone)]
pub struct EscalationHandler {
    storage: Arc<dyn StorageBackend>,
    queue: Arc<dyn NotificationQueue>,
}

impl EscalationHandler {
    pub fn new(storage: Arc<dyn StorageBackend>, queue: Arc<dyn NotificationQueue>) -> Self {
        Self { storage, queue }
    }

    /// Record the outage and notify the subscribers active right now
    #[instrument(skip(self, resource_name), fields(resource = %resource_name))]
    pub async fn escalate(
        &self,
        resource_id: i64,
        resource_name: &str,
        attempts: u32,
    ) -> EscalationReport {
        let now = Utc::now();
        let mut report = EscalationReport::default();

        match self.storage.append_journal_entry(resource_id, now).await {
            Ok(entry) => {
                debug!("journal entry {} written", entry.id);
                report.journal_entry = Some(entry);
            }
            Err(e) => error!("failed to write journal entry: {e}"),
        }

        let subscribers = match self.storage.list_active_subscribers().await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                error!("failed to read subscribers, nobody will be notified: {e}");
                report.subscribers_unavailable = true;
                return report;
            }
        };

        let body = format_alert(resource_name, attempts, now);
        for destination in subscribers {
            let message = NotificationMessage::new(&destination, &body);
            match self.queue.push(message).await {
                Ok(()) => report.enqueued += 1,
                Err(e) => {
                    error!("failed to enqueue alert for {destination}: {e}");
                    report.failed += 1;
                }
            }
        }

        if report.journal_entry.is_none() && report.enqueued > 0 {
            warn!("alerts enqueued without a journal entry");
        }
        if report.journal_entry.is_some() && report.failed > 0 {
            warn!("journal written but {} alerts were lost", report.failed);
        }

        debug!("{} alerts enqueued", report.enqueued);
        report
    }
}

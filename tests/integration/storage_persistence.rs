//! Integration tests for the SQLite backend and its durable queue
//!
//! These tests verify that:
//! - Queued alerts survive closing and reopening the database
//! - A claimed but unacknowledged alert is delivered after a restart
//! - Escalation writes journal and queue through the same database
//! - Journal entries outlive the resource they refer to
//! - Concurrent escalations get distinct journal rows and all their messages

use std::collections::HashSet;
use std::sync::Arc;

use pingwatch::actors::EscalationHandler;
use pingwatch::actors::delivery::drain_queue;
use pingwatch::queue::NotificationQueue;
use pingwatch::storage::StorageBackend;
use pingwatch::storage::sqlite::SqliteBackend;
use pingwatch::{NotificationMessage, ResourceAddress};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use crate::helpers::*;

#[tokio::test]
async fn test_queue_survives_restart() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("pingwatch.db");

    {
        let backend = SqliteBackend::new(&db_path).await.unwrap();
        let queue = backend.queue();
        queue.push(NotificationMessage::new("A", "m1")).await.unwrap();
        queue.push(NotificationMessage::new("B", "m2")).await.unwrap();
        backend.close().await.unwrap();
    }

    let backend = SqliteBackend::new(&db_path).await.unwrap();
    let queue = backend.queue();
    assert_eq!(queue.len().await.unwrap(), 2);

    let channel = RecordingChannel::default();
    drain_queue(&queue, &channel).await;
    assert_eq!(channel.bodies().await, vec!["m1", "m2"]);
    assert!(queue.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_unacked_claim_redelivered_after_restart() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("pingwatch.db");

    {
        let backend = SqliteBackend::new(&db_path).await.unwrap();
        let queue = backend.queue();
        queue.push(NotificationMessage::new("A", "m1")).await.unwrap();

        // sent, then the process died before the ack
        let claimed = queue.claim().await.unwrap().unwrap();
        assert_eq!(claimed.message.body, "m1");
        backend.close().await.unwrap();
    }

    let backend = SqliteBackend::new(&db_path).await.unwrap();
    let queue = backend.queue();
    let channel = RecordingChannel::default();

    let report = drain_queue(&queue, &channel).await;
    assert_eq!(report.sent, 1);
    assert_eq!(channel.bodies().await, vec!["m1"]);
}

#[tokio::test]
async fn test_escalation_through_sqlite() {
    let temp_dir = tempdir().unwrap();
    let backend = Arc::new(
        SqliteBackend::new(temp_dir.path().join("pingwatch.db"))
            .await
            .unwrap(),
    );
    let queue = Arc::new(backend.queue());

    let resource = backend
        .insert_resource(ResourceAddress::parse("10.1.1.1").unwrap(), "camera")
        .await
        .unwrap();
    backend.set_subscriber_active("100", true).await.unwrap();
    backend.set_subscriber_active("200", true).await.unwrap();
    backend.set_subscriber_active("200", false).await.unwrap();

    let escalation = EscalationHandler::new(backend.clone(), queue.clone());
    let report = escalation.escalate(resource.id, &resource.name, 3).await;

    assert_eq!(report.enqueued, 1);
    let journal = backend.list_journal(Some(resource.id), 10).await.unwrap();
    assert_eq!(journal, vec![report.journal_entry.unwrap()]);

    let message = queue.pop().await.unwrap().unwrap();
    assert_eq!(message.destination, "100");
    assert!(message.body.contains("camera"));
}

#[tokio::test]
async fn test_journal_outlives_resource() {
    let temp_dir = tempdir().unwrap();
    let backend = SqliteBackend::new(temp_dir.path().join("pingwatch.db"))
        .await
        .unwrap();

    let resource = backend
        .insert_resource(ResourceAddress::parse("https://example.org").unwrap(), "site")
        .await
        .unwrap();
    backend
        .append_journal_entry(resource.id, chrono::Utc::now())
        .await
        .unwrap();

    assert!(backend.remove_resource(resource.id).await.unwrap());
    assert!(backend.list_resources().await.unwrap().is_empty());
    assert_eq!(
        backend.list_journal(Some(resource.id), 10).await.unwrap().len(),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_escalations_through_sqlite() {
    let temp_dir = tempdir().unwrap();
    let backend = Arc::new(
        SqliteBackend::new(temp_dir.path().join("pingwatch.db"))
            .await
            .unwrap(),
    );
    let queue = Arc::new(backend.queue());
    backend.set_subscriber_active("100", true).await.unwrap();
    backend.set_subscriber_active("200", true).await.unwrap();

    let escalation = EscalationHandler::new(backend.clone(), queue.clone());
    let mut tasks = vec![];
    for resource_id in 1..=24 {
        let escalation = escalation.clone();
        tasks.push(tokio::spawn(async move {
            escalation
                .escalate(resource_id, &format!("resource-{resource_id}"), 3)
                .await
        }));
    }

    let mut ids = HashSet::new();
    for task in tasks {
        let report = task.await.unwrap();
        assert_eq!(report.enqueued, 2);
        let entry = report.journal_entry.unwrap();
        assert!(ids.insert(entry.id), "duplicate journal id {}", entry.id);
    }

    let journal = backend.list_journal(None, 100).await.unwrap();
    assert_eq!(journal.len(), 24);
    let resources: HashSet<_> = journal.iter().map(|e| e.resource_id).collect();
    assert_eq!(resources, (1..=24).collect::<HashSet<_>>());
    assert_eq!(queue.len().await.unwrap(), 48);

    let messages = drain_all(queue.as_ref()).await;
    assert_eq!(messages.len(), 48);
    assert!(queue.is_empty().await.unwrap());
}

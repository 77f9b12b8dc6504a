//! Failure tests for the escalation and scheduling path
//!
//! Journal, subscriber read and queue push fail independently; none of them
//! may take the others down, and none may stop the next tick.

use std::sync::Arc;
use std::time::Duration;

use pingwatch::actors::{CheckDispatcher, EscalationHandler, SchedulerHandle};
use pingwatch::queue::NotificationQueue;
use pingwatch::storage::StorageBackend;
use pingwatch::ResourceAddress;

use crate::helpers::*;

async fn flaky_fixture() -> (Arc<FlakyStorage>, Arc<FlakyQueue>, EscalationHandler) {
    let storage = FlakyStorage::new();
    storage.inner.set_subscriber_active("alice", true).await.unwrap();
    storage.inner.set_subscriber_active("bob", true).await.unwrap();
    let queue = Arc::new(FlakyQueue::default());
    let escalation = EscalationHandler::new(storage.clone(), queue.clone());
    (storage, queue, escalation)
}

#[tokio::test]
async fn test_journal_failure_still_notifies() {
    let (storage, queue, escalation) = flaky_fixture().await;
    set_failing(&storage.fail_journal, true);

    let report = escalation.escalate(1, "router", 3).await;

    assert!(report.journal_entry.is_none());
    assert_eq!(report.enqueued, 2);
    assert_eq!(queue.len().await.unwrap(), 2);
    assert!(storage.list_journal(None, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_queue_failure_still_journals() {
    let (storage, queue, escalation) = flaky_fixture().await;
    set_failing(&queue.fail_push, true);

    let report = escalation.escalate(1, "router", 3).await;

    assert!(report.journal_entry.is_some());
    assert_eq!(report.enqueued, 0);
    assert_eq!(report.failed, 2);
    assert_eq!(storage.list_journal(Some(1), 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_subscriber_read_failure_enqueues_nothing() {
    let (storage, queue, escalation) = flaky_fixture().await;
    set_failing(&storage.fail_subscribers, true);

    let report = escalation.escalate(1, "router", 3).await;

    assert!(report.subscribers_unavailable);
    assert!(report.journal_entry.is_some());
    assert!(queue.is_empty().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_failure_skips_tick_only() {
    let (storage, _queue, escalation) = flaky_fixture().await;
    storage
        .inner
        .insert_resource(ResourceAddress::parse("10.0.0.1").unwrap(), "router")
        .await
        .unwrap();
    set_failing(&storage.fail_resources, true);

    let probe = ScriptedProbe::always(true);
    let dispatcher = CheckDispatcher::new(probe.clone(), escalation, policy());
    let scheduler = SchedulerHandle::spawn(storage.clone(), dispatcher, Duration::from_secs(60));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(probe.calls().await, 0);
    assert!(scheduler.check_now().await.is_err());

    set_failing(&storage.fail_resources, false);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(probe.calls().await, 1);

    let batch = scheduler.check_now().await.unwrap();
    assert_eq!(batch.join().await.len(), 1);

    scheduler.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_escalation_failure_does_not_affect_other_machines() {
    let (storage, queue, escalation) = flaky_fixture().await;
    set_failing(&storage.fail_journal, true);
    set_failing(&queue.fail_push, true);

    let dispatcher = CheckDispatcher::new(ScriptedProbe::always(false), escalation, policy());
    let batch = dispatcher.dispatch(vec![
        resource(1, "10.0.0.1", "a"),
        resource(2, "10.0.0.2", "b"),
    ]);

    let outcomes = batch.join().await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.is_exhausted()));
}

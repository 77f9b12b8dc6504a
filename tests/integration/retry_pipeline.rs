//! End-to-end retry scenarios on a paused clock
//!
//! - Always-failing resource: probes at t=0, 8, 16, then one escalation
//! - Recovery on attempt k: no journal entry, no notification
//! - Subscriber changes during the retry window
//! - Full pipeline: scheduler tick → escalation → delivery

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use pingwatch::actors::{
    CheckDispatcher, DeliveryHandle, RetryMachine, RetryOutcome, RetryPolicy, SchedulerHandle,
};
use pingwatch::queue::NotificationQueue;
use pingwatch::storage::StorageBackend;
use pingwatch::ResourceAddress;
use pretty_assertions::assert_eq;
use tokio::time::Instant;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn test_always_failing_probes_spaced_by_backoff() {
    let (storage, queue, escalation) = memory_fixture(&["alice", "bob"]).await;
    let probe = ScriptedProbe::always(false);

    let start = Instant::now();
    let outcome = RetryMachine::new(resource(1, "192.168.1.1", "gateway"), policy())
        .run(probe.as_ref(), &escalation)
        .await;

    assert_eq!(probe.call_offsets(start).await, vec![0, 8, 16]);
    assert_matches!(outcome, RetryOutcome::Exhausted { attempts: 3, .. });

    let journal = storage.list_journal(None, 10).await.unwrap();
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].resource_id, 1);

    let messages = drain_all(queue.as_ref()).await;
    let destinations: Vec<_> = messages.iter().map(|m| m.destination.as_str()).collect();
    assert_eq!(destinations, vec!["alice", "bob"]);
    assert!(messages.iter().all(|m| m.body.contains("gateway")));
    assert!(messages.iter().all(|m| m.body.contains("3 attempts")));
}

#[tokio::test(start_paused = true)]
async fn test_fail_then_succeed() {
    let (storage, queue, escalation) = memory_fixture(&["alice"]).await;
    let probe = ScriptedProbe::script(vec![false, true], false);

    let outcome = RetryMachine::new(resource(1, "10.0.0.1", "nas"), policy())
        .run(probe.as_ref(), &escalation)
        .await;

    assert_eq!(
        outcome,
        RetryOutcome::Success {
            resource_id: 1,
            attempts: 2
        }
    );
    assert_eq!(probe.calls().await, 2);
    assert!(storage.list_journal(None, 10).await.unwrap().is_empty());
    assert!(queue.is_empty().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_success_on_each_attempt() {
    for k in 1..=5u32 {
        let (storage, queue, escalation) = memory_fixture(&["alice"]).await;
        let mut script = vec![false; (k - 1) as usize];
        script.push(true);
        let probe = ScriptedProbe::script(script, false);

        let start = Instant::now();
        let outcome = RetryMachine::new(
            resource(1, "10.0.0.1", "nas"),
            RetryPolicy::new(5, Duration::from_secs(8)),
        )
        .run(probe.as_ref(), &escalation)
        .await;

        assert_eq!(outcome.attempts(), k);
        assert!(!outcome.is_exhausted());
        assert_eq!(start.elapsed(), Duration::from_secs(8 * u64::from(k - 1)));
        assert!(storage.list_journal(None, 10).await.unwrap().is_empty());
        assert!(queue.is_empty().await.unwrap());
    }
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_read_at_escalation_time() {
    let (storage, queue, escalation) = memory_fixture(&["early"]).await;
    let dispatcher = CheckDispatcher::new(ScriptedProbe::always(false), escalation, policy());

    let batch = dispatcher.dispatch(vec![resource(1, "10.0.0.1", "nas")]);

    // inside the retry window
    tokio::time::sleep(Duration::from_secs(10)).await;
    storage.set_subscriber_active("early", false).await.unwrap();
    storage.set_subscriber_active("late", true).await.unwrap();

    let outcomes = batch.join().await;
    assert_eq!(outcomes.len(), 1);

    let destinations: Vec<_> = drain_all(queue.as_ref())
        .await
        .into_iter()
        .map(|m| m.destination)
        .collect();
    assert_eq!(destinations, vec!["late".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_to_delivery() {
    let (storage, queue, escalation) = memory_fixture(&["alice"]).await;
    storage
        .insert_resource(ResourceAddress::parse("10.0.0.9").unwrap(), "printer")
        .await
        .unwrap();
    storage
        .insert_resource(ResourceAddress::parse("https://example.org").unwrap(), "site")
        .await
        .unwrap();

    // the printer never answers, the site always does
    struct PrinterDown;

    #[async_trait::async_trait]
    impl pingwatch::probe::Probe for PrinterDown {
        async fn probe(&self, address: &ResourceAddress) -> anyhow::Result<bool> {
            Ok(matches!(address, ResourceAddress::Http(_)))
        }
    }

    let channel = Arc::new(RecordingChannel::default());
    let dispatcher = CheckDispatcher::new(Arc::new(PrinterDown), escalation, policy());
    let scheduler = SchedulerHandle::spawn(storage.clone(), dispatcher, Duration::from_secs(60));
    let delivery = DeliveryHandle::spawn(queue.clone(), channel.clone(), Duration::from_secs(30));

    // tick at t=0, escalation at t=16, drain at t=30
    tokio::time::sleep(Duration::from_secs(31)).await;

    assert_eq!(channel.destinations().await, vec!["alice".to_string()]);
    assert!(channel.bodies().await[0].contains("printer"));
    assert_eq!(storage.list_journal(None, 10).await.unwrap().len(), 1);
    assert!(queue.is_empty().await.unwrap());

    scheduler.shutdown().await.unwrap();
    delivery.shutdown().await.unwrap();
}

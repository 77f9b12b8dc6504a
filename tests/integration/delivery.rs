//! Delivery consumer behaviour against the memory queue

use std::sync::Arc;
use std::time::Duration;

use pingwatch::actors::delivery::drain_queue;
use pingwatch::actors::{DeliveryHandle, DrainReport};
use pingwatch::queue::{MemoryQueue, NotificationQueue};
use pingwatch::NotificationMessage;
use pretty_assertions::assert_eq;
use tokio_test::assert_ok;

use crate::helpers::*;

#[tokio::test]
async fn test_fifo_across_destinations() {
    let queue = MemoryQueue::new();
    assert_ok!(queue.push(NotificationMessage::new("A", "m1")).await);
    assert_ok!(queue.push(NotificationMessage::new("A", "m2")).await);
    assert_ok!(queue.push(NotificationMessage::new("B", "m3")).await);
    let channel = RecordingChannel::default();

    drain_queue(&queue, &channel).await;

    assert_eq!(channel.bodies().await, vec!["m1", "m2", "m3"]);
    assert_eq!(channel.destinations().await, vec!["A", "A", "B"]);
}

#[tokio::test]
async fn test_empty_drain_sends_nothing() {
    let queue = MemoryQueue::new();
    let channel = RecordingChannel::default();

    let report = drain_queue(&queue, &channel).await;

    assert_eq!(report, DrainReport::default());
    assert!(channel.delivered.lock().await.is_empty());
}

#[tokio::test]
async fn test_claimed_but_unacked_is_redelivered() {
    let queue = MemoryQueue::new();
    assert_ok!(queue.push(NotificationMessage::new("A", "m1")).await);

    // a consumer that claimed and then died before acknowledging
    let claimed = queue.claim().await.unwrap().unwrap();
    assert_eq!(claimed.message.body, "m1");

    let channel = RecordingChannel::default();
    let report = drain_queue(&queue, &channel).await;

    assert_eq!(report.sent, 1);
    assert_eq!(channel.bodies().await, vec!["m1"]);
    assert!(queue.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_rejected_messages_are_not_requeued() {
    let queue = MemoryQueue::new();
    assert_ok!(queue.push(NotificationMessage::new("blocked", "m1")).await);
    assert_ok!(queue.push(NotificationMessage::new("A", "m2")).await);
    let channel = RecordingChannel::rejecting(&["blocked"]);

    let report = drain_queue(&queue, &channel).await;
    assert_eq!(
        report,
        DrainReport {
            sent: 1,
            failed: 1,
            interrupted: false
        }
    );

    // nothing comes back on the next drain
    let report = drain_queue(&queue, &channel).await;
    assert_eq!(report, DrainReport::default());
    assert_eq!(channel.bodies().await, vec!["m2"]);
}

#[tokio::test]
async fn test_claim_failure_interrupts_drain() {
    let queue = FlakyQueue::default();
    assert_ok!(queue.push(NotificationMessage::new("A", "m1")).await);
    set_failing(&queue.fail_claim, true);
    let channel = RecordingChannel::default();

    let report = drain_queue(&queue, &channel).await;
    assert!(report.interrupted);
    assert_eq!(report.sent, 0);

    // the next drain picks up where it left off
    set_failing(&queue.fail_claim, false);
    let report = drain_queue(&queue, &channel).await;
    assert_eq!(report.sent, 1);
    assert!(!report.interrupted);
}

#[tokio::test(start_paused = true)]
async fn test_actor_drains_on_its_own_timer() {
    let queue = Arc::new(MemoryQueue::new());
    let channel = Arc::new(RecordingChannel::default());
    let handle = DeliveryHandle::spawn(queue.clone(), channel.clone(), Duration::from_secs(30));

    tokio::time::sleep(Duration::from_secs(5)).await;
    for body in ["m1", "m2"] {
        assert_ok!(queue.push(NotificationMessage::new("A", body)).await);
    }

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(channel.bodies().await.is_empty());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(channel.bodies().await, vec!["m1", "m2"]);

    let report = handle.drain_now().await.unwrap();
    assert_eq!(report, DrainReport::default());

    handle.shutdown().await.unwrap();
}

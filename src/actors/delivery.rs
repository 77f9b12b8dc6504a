//! DeliveryActor - Drains the notification queue every `mailing_period`
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → claim head → channel.send → ack → ... until the queue is empty
//!     ↑
//!     └─── Commands (DrainNow, Shutdown)
//! ```
//!
//! A message is only removed after the send attempt, so a crash between send
//! and ack delivers it again on the next drain (at-least-once). A send the
//! channel rejects is logged and acknowledged anyway; it is not re-queued.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, error, instrument, trace, warn};

use crate::channel::NotificationChannel;
use crate::queue::NotificationQueue;

use super::messages::{DeliveryCommand, DrainReport};

pub struct DeliveryActor {
    queue: Arc<dyn NotificationQueue>,
    channel: Arc<dyn NotificationChannel>,
    command_rx: mpsc::Receiver<DeliveryCommand>,
    period: Duration,
}

impl DeliveryActor {
    pub fn new(
        queue: Arc<dyn NotificationQueue>,
        channel: Arc<dyn NotificationChannel>,
        period: Duration,
        command_rx: mpsc::Receiver<DeliveryCommand>,
    ) -> Self {
        Self {
            queue,
            channel,
            command_rx,
            period,
        }
    }

    #[instrument(skip(self), fields(period = ?self.period))]
    pub async fn run(mut self) {
        debug!("starting delivery actor");

        let mut ticker = interval(self.period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.drain().await;
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        DeliveryCommand::DrainNow { respond_to } => {
                            debug!("received DrainNow command");
                            let report = self.drain().await;
                            let _ = respond_to.send(report);
                        }

                        DeliveryCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("delivery actor stopped");
    }

    /// Send every queued message in FIFO order
    pub async fn drain(&self) -> DrainReport {
        drain_queue(self.queue.as_ref(), self.channel.as_ref()).await
    }
}

/// Claim, send and acknowledge until the queue is empty
///
/// A queue error ends the drain early; whatever is left waits for the next one.
#[instrument(skip_all)]
pub async fn drain_queue(
    queue: &dyn NotificationQueue,
    channel: &dyn NotificationChannel,
) -> DrainReport {
    let mut report = DrainReport::default();

    loop {
        let queued = match queue.claim().await {
            Ok(Some(queued)) => queued,
            Ok(None) => break,
            Err(e) => {
                error!("failed to read notification queue: {e}");
                report.interrupted = true;
                break;
            }
        };

        let message = &queued.message;
        match channel.send(&message.destination, &message.body).await {
            Ok(()) => {
                trace!("delivered message {} to {}", queued.id, message.destination);
                report.sent += 1;
            }
            Err(e) => {
                warn!(
                    "dropping message {} for {}: {e}",
                    queued.id, message.destination
                );
                report.failed += 1;
            }
        }

        // without the ack the same head would be claimed forever
        if let Err(e) = queue.ack(queued.id).await {
            error!("failed to acknowledge message {}: {e}", queued.id);
            report.interrupted = true;
            break;
        }
    }

    if report.sent + report.failed > 0 {
        debug!("drained {} messages ({} failed)", report.sent + report.failed, report.failed);
    }
    report
}

/// Handle for controlling a DeliveryActor
#[derive(Clone)]
pub struct DeliveryHandle {
    sender: mpsc::Sender<DeliveryCommand>,
}

impl DeliveryHandle {
    /// Spawn the actor; the first drain runs right away
    pub fn spawn(
        queue: Arc<dyn NotificationQueue>,
        channel: Arc<dyn NotificationChannel>,
        period: Duration,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = DeliveryActor::new(queue, channel, period, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    pub async fn drain_now(&self) -> Result<DrainReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(DeliveryCommand::DrainNow { respond_to: tx })
            .await
            .context("failed to send DrainNow command")?;

        rx.await.context("failed to receive response")
    }

    /// Stop after the drain in progress, if any
    ///
    /// Returns once the actor has stopped.
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(DeliveryCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        self.sender.closed().await;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

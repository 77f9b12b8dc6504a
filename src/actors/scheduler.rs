//! ProbeSchedulerActor - Fires a probe tick every `period`
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → list_resources (fresh) → CheckDispatcher::dispatch → N retry machines
//!     ↑
//!     └─── Commands (CheckNow, Shutdown)
//! ```
//!
//! The actor never waits for the machines it starts. It only keeps their abort
//! handles so that shutdown can abandon whatever is still retrying.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tokio::time::interval;
use tracing::{debug, error, instrument, trace, warn};

use crate::storage::StorageBackend;

use super::dispatcher::{CheckDispatcher, DispatchedBatch};
use super::messages::SchedulerCommand;

pub struct ProbeSchedulerActor {
    /// Source of the resource snapshot, read on every tick
    storage: Arc<dyn StorageBackend>,

    dispatcher: CheckDispatcher,

    command_rx: mpsc::Receiver<SchedulerCommand>,

    /// Current tick period
    period: Duration,

    /// Machines started by this actor that may still be running
    in_flight: Vec<AbortHandle>,
}

impl ProbeSchedulerActor {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        dispatcher: CheckDispatcher,
        period: Duration,
        command_rx: mpsc::Receiver<SchedulerCommand>,
    ) -> Self {
        Self {
            storage,
            dispatcher,
            command_rx,
            period,
            in_flight: Vec::new(),
        }
    }

    /// Run until Shutdown or until every handle is dropped
    #[instrument(skip(self), fields(period = ?self.period))]
    pub async fn run(mut self) {
        debug!("starting probe scheduler");

        let mut ticker = interval(self.period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(batch) => self.track(&batch),
                        Err(e) => error!("probe tick skipped: {e:#}"),
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        SchedulerCommand::CheckNow { respond_to } => {
                            debug!("received CheckNow command");
                            let result = self.tick().await;
                            if let Ok(batch) = &result {
                                self.track(batch);
                            }
                            let _ = respond_to.send(result);
                        }

                        SchedulerCommand::Shutdown => {
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

        self.abort_in_flight().await;
        debug!("probe scheduler stopped");
    }

    /// Read a fresh snapshot and start one machine per resource
    async fn tick(&mut self) -> Result<DispatchedBatch> {
        let snapshot = self
            .storage
            .list_resources()
            .await
            .context("failed to read resources")?;

        trace!("probing {} resources", snapshot.len());
        Ok(self.dispatcher.dispatch(snapshot))
    }

    fn track(&mut self, batch: &DispatchedBatch) {
        self.in_flight.retain(|handle| !handle.is_finished());
        self.in_flight.extend(batch.abort_handles());
    }

    async fn abort_in_flight(&mut self) {
        let running: Vec<_> = self
            .in_flight
            .drain(..)
            .filter(|handle| !handle.is_finished())
            .collect();

        if running.is_empty() {
            return;
        }

        debug!("abandoning {} in-flight retry machines", running.len());
        for handle in &running {
            handle.abort();
        }
        // a machine being polled right now only stops at its next await point
        while running.iter().any(|handle| !handle.is_finished()) {
            tokio::task::yield_now().await;
        }
    }
}

/// Handle for controlling a ProbeSchedulerActor
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Spawn the scheduler on the current runtime
    ///
    /// The first tick fires right away.
    pub fn spawn(
        storage: Arc<dyn StorageBackend>,
        dispatcher: CheckDispatcher,
        period: Duration,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = ProbeSchedulerActor::new(storage, dispatcher, period, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Run a tick right away and hand back the started machines
    pub async fn check_now(&self) -> Result<DispatchedBatch> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::CheckNow { respond_to: tx })
            .await
            .context("failed to send CheckNow command")?;

        rx.await.context("failed to receive response")?
    }

    /// Stop ticking and abort every machine still running
    ///
    /// Returns once the actor and every machine it started have stopped.
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SchedulerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        self.sender.closed().await;
        Ok(())
    }

    /// True once the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Commands**: Request/response messages sent to specific actors via mpsc
//! 2. **Reports**: Plain values describing what one unit of work did, so callers
//!    (and tests) can observe outcomes without scraping logs

use tokio::sync::oneshot;

use crate::JournalEntry;

use super::dispatcher::DispatchedBatch;

/// Commands that can be sent to the ProbeSchedulerActor
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Take a snapshot and dispatch a batch right away (bypassing the timer)
    ///
    /// The batch is handed back so the caller can wait for the outcomes.
    CheckNow {
        respond_to: oneshot::Sender<anyhow::Result<DispatchedBatch>>,
    },

    /// Stop ticking and abandon all in-flight retry machines
    Shutdown,
}

/// Commands that can be sent to the DeliveryActor
#[derive(Debug)]
pub enum DeliveryCommand {
    /// Drain the queue right away (bypassing the timer)
    DrainNow {
        respond_to: oneshot::Sender<DrainReport>,
    },

    /// Gracefully shut down the delivery actor
    ///
    /// A drain in progress finishes first.
    Shutdown,
}

/// What one drain did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Messages the channel accepted
    pub sent: usize,

    /// Messages the channel refused or could not be reached for (dropped)
    pub failed: usize,

    /// The drain stopped early because the queue itself failed
    pub interrupted: bool,
}

/// What one escalation did
///
/// Journal and queue are independent side effects, so any combination of
/// success and failure is possible and is reported here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscalationReport {
    /// The journal entry, if the append succeeded
    pub journal_entry: Option<JournalEntry>,

    /// Subscribers whose message was enqueued
    pub enqueued: usize,

    /// Subscribers whose message could not be enqueued
    pub failed: usize,

    /// The subscriber list could not be read, so nobody was notified
    pub subscribers_unavailable: bool,
}

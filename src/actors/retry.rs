//! RetryMachine - Bounded retries of one resource within one probe tick
//!
//! ## State Machine
//!
//! ```text
//! Pending ──> Probing ──(reachable)──────────────────────> Success
//!                ↑  │
//!                │  └──(unreachable, attempts < max)──> Retrying
//!                │                                         │
//!                └──────────────(after backoff)────────────┘
//!
//!             Probing ──(unreachable, attempts == max)──> Exhausted ──> escalate once
//! ```
//!
//! The transitions (`begin`, `record`, `resume`) are synchronous and pure; `run`
//! drives them with the probe, the backoff sleep and the escalation handler.
//! The backoff is a fixed delay and only suspends this machine's task.

use std::time::Duration;

use tracing::{debug, instrument, trace, warn};

use crate::config::Config;
use crate::probe::Probe;
use crate::{ProbeOutcome, ResourceDescriptor};

use super::escalation::EscalationHandler;
use super::messages::EscalationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Pending,
    Probing,
    Retrying,
    Success,
    Exhausted,
}

impl RetryState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RetryState::Success | RetryState::Exhausted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Probe calls per cycle, at least one
    pub max_attempts: u32,

    /// Fixed delay between two calls
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_tries, config.retry_period())
    }
}

/// Counter state of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    pub resource_id: i64,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub backoff: Duration,
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    Success {
        resource_id: i64,
        attempts: u32,
    },
    Exhausted {
        resource_id: i64,
        attempts: u32,
        report: EscalationReport,
    },
}

impl RetryOutcome {
    pub fn resource_id(&self) -> i64 {
        match self {
            RetryOutcome::Success { resource_id, .. }
            | RetryOutcome::Exhausted { resource_id, .. } => *resource_id,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Success { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryOutcome::Exhausted { .. })
    }
}

pub struct RetryMachine {
    resource: ResourceDescriptor,
    attempt: RetryAttempt,
    state: RetryState,
    last_outcome: Option<ProbeOutcome>,
}

impl RetryMachine {
    pub fn new(resource: ResourceDescriptor, policy: RetryPolicy) -> Self {
        let attempt = RetryAttempt {
            resource_id: resource.id,
            attempts_made: 0,
            max_attempts: policy.max_attempts.max(1),
            backoff: policy.backoff,
        };

        Self {
            resource,
            attempt,
            state: RetryState::Pending,
            last_outcome: None,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn attempt(&self) -> &RetryAttempt {
        &self.attempt
    }

    pub fn last_outcome(&self) -> Option<ProbeOutcome> {
        self.last_outcome
    }

    pub fn resource(&self) -> &ResourceDescriptor {
        &self.resource
    }

    /// Pending → Probing
    pub fn begin(&mut self) -> RetryState {
        if self.state == RetryState::Pending {
            self.state = RetryState::Probing;
        }
        self.state
    }

    /// Feed the result of the probe call made in `Probing`
    ///
    /// Ignored in any other state.
    pub fn record(&mut self, success: bool) -> RetryState {
        if self.state != RetryState::Probing {
            return self.state;
        }

        self.last_outcome = Some(ProbeOutcome::now(success));
        self.attempt.attempts_made += 1;

        self.state = if success {
            RetryState::Success
        } else if self.attempt.attempts_made < self.attempt.max_attempts {
            RetryState::Retrying
        } else {
            RetryState::Exhausted
        };
        self.state
    }

    /// Retrying → Probing, once the backoff has passed
    pub fn resume(&mut self) -> RetryState {
        if self.state == RetryState::Retrying {
            self.state = RetryState::Probing;
        }
        self.state
    }

    /// Drive the machine to a terminal state
    ///
    /// Escalates exactly once if the machine ends in `Exhausted`.
    #[instrument(skip_all, fields(resource_id = self.resource.id, resource = %self.resource.name))]
    pub async fn run(mut self, probe: &dyn Probe, escalation: &EscalationHandler) -> RetryOutcome {
        loop {
            match self.state {
                RetryState::Pending => {
                    self.begin();
                }

                RetryState::Probing => {
                    let success = match probe.probe(&self.resource.address).await {
                        Ok(reachable) => reachable,
                        Err(e) => {
                            debug!("probe error: {e:#}");
                            false
                        }
                    };
                    let state = self.record(success);
                    trace!(
                        "attempt {}/{} → {state:?}",
                        self.attempt.attempts_made, self.attempt.max_attempts
                    );
                }

                RetryState::Retrying => {
                    tokio::time::sleep(self.attempt.backoff).await;
                    self.resume();
                }

                RetryState::Success => {
                    debug!("reachable after {} attempts", self.attempt.attempts_made);
                    return RetryOutcome::Success {
                        resource_id: self.resource.id,
                        attempts: self.attempt.attempts_made,
                    };
                }

                RetryState::Exhausted => {
                    warn!(
                        "{} ({}) unreachable after {} attempts, escalating",
                        self.resource.name, self.resource.address, self.attempt.attempts_made
                    );
                    let report = escalation
                        .escalate(
                            self.resource.id,
                            &self.resource.name,
                            self.attempt.attempts_made,
                        )
                        .await;
                    return RetryOutcome::Exhausted {
                        resource_id: self.resource.id,
                        attempts: self.attempt.attempts_made,
                        report,
                    };
                }
            }
        }
    }
}

//! CheckDispatcher - Starts one retry machine per resource of a snapshot
//!
//! `dispatch` only spawns; it returns as soon as every machine is started and
//! never waits for them. Batches of consecutive ticks may overlap unless
//! single-flight mode is on, in which case a resource whose machine from an
//! earlier tick is still running is skipped.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, trace};

use crate::ResourceDescriptor;
use crate::probe::Probe;

use super::escalation::EscalationHandler;
use super::retry::{RetryMachine, RetryOutcome, RetryPolicy};

type InFlight = Arc<Mutex<HashSet<i64>>>;

/// Removes its resource id from the in-flight set when the task ends or is aborted
struct InFlightGuard {
    set: InFlight,
    resource_id: i64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.resource_id);
    }
}

/// The machines started by one `dispatch` call
#[derive(Debug, Default)]
pub struct DispatchedBatch {
    pub handles: Vec<(i64, JoinHandle<RetryOutcome>)>,

    /// Resources left out because their previous machine was still running
    pub skipped: Vec<i64>,
}

impl DispatchedBatch {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn resource_ids(&self) -> Vec<i64> {
        self.handles.iter().map(|(id, _)| *id).collect()
    }

    pub fn abort_handles(&self) -> Vec<AbortHandle> {
        self.handles
            .iter()
            .map(|(_, handle)| handle.abort_handle())
            .collect()
    }

    /// Wait for every machine of the batch
    ///
    /// Machines that were aborted or panicked are logged and left out.
    pub async fn join(self) -> Vec<RetryOutcome> {
        let (ids, handles): (Vec<_>, Vec<_>) = self.handles.into_iter().unzip();

        join_all(handles)
            .await
            .into_iter()
            .zip(ids)
            .filter_map(|(result, id)| match result {
                Ok(outcome) => Some(outcome),
                Err(e) if e.is_cancelled() => {
                    debug!("retry machine for resource {id} was cancelled");
                    None
                }
                Err(e) => {
                    error!("retry machine for resource {id} failed: {e}");
                    None
                }
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct CheckDispatcher {
    probe: Arc<dyn Probe>,
    escalation: EscalationHandler,
    policy: RetryPolicy,
    in_flight: Option<InFlight>,
}

impl CheckDispatcher {
    pub fn new(probe: Arc<dyn Probe>, escalation: EscalationHandler, policy: RetryPolicy) -> Self {
        Self {
            probe,
            escalation,
            policy,
            in_flight: None,
        }
    }

    /// Cap to one in-flight machine per resource
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(InFlight::default);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Spawn one retry machine per resource and return without waiting
    pub fn dispatch(&self, snapshot: Vec<ResourceDescriptor>) -> DispatchedBatch {
        let mut batch = DispatchedBatch::default();

        for resource in snapshot {
            let resource_id = resource.id;

            let guard = match &self.in_flight {
                Some(set) => {
                    let inserted = set
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(resource_id);
                    if !inserted {
                        debug!("resource {resource_id} still retrying, skipped");
                        batch.skipped.push(resource_id);
                        continue;
                    }
                    Some(InFlightGuard {
                        set: set.clone(),
                        resource_id,
                    })
                }
                None => None,
            };

            let machine = RetryMachine::new(resource, self.policy);
            let probe = self.probe.clone();
            let escalation = self.escalation.clone();

            let handle = tokio::spawn(async move {
                let _guard = guard;
                machine.run(probe.as_ref(), &escalation).await
            });
            batch.handles.push((resource_id, handle));
        }

        trace!(
            "dispatched {} machines, skipped {}",
            batch.len(),
            batch.skipped.len()
        );
        batch
    }
}

//! Actor-based probing pipeline
//!
//! Two timer actors run independently as tokio tasks, each controlled through
//! an mpsc command channel and a cloneable handle.
//!
//! ## Architecture Overview
//!
//! ```text
//!   ┌────────────────────┐  tick (period)
//!   │ ProbeSchedulerActor│──── list_resources ────> StorageBackend
//!   └─────────┬──────────┘
//!             │ snapshot
//!   ┌─────────▼──────────┐
//!   │  CheckDispatcher   │  one task per resource
//!   └─────────┬──────────┘
//!     ┌───────┼────────┐
//!     ▼       ▼        ▼
//!  RetryMachine ... RetryMachine   probe, backoff, probe, ...
//!             │ exhausted
//!   ┌─────────▼──────────┐
//!   │ EscalationHandler  │──── journal entry ─────> StorageBackend
//!   └─────────┬──────────┘
//!             │ one message per active subscriber
//!   ┌─────────▼──────────┐
//!   │ NotificationQueue  │
//!   └─────────┬──────────┘
//!             │ claim / ack   tick (mailing_period)
//!   ┌─────────▼──────────┐
//!   │   DeliveryActor    │──── send ──────────────> NotificationChannel
//!   └────────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: each timer actor has an mpsc command channel
//! 2. **Request/Response**: oneshot channels for `check_now` and `drain_now`
//! 3. **Queue**: the only link between the probing side and the delivery side

pub mod delivery;
pub mod dispatcher;
pub mod escalation;
pub mod messages;
pub mod retry;
pub mod scheduler;

pub use delivery::{DeliveryActor, DeliveryHandle};
pub use dispatcher::{CheckDispatcher, DispatchedBatch};
pub use escalation::EscalationHandler;
pub use messages::{DrainReport, EscalationReport};
pub use retry::{RetryMachine, RetryOutcome, RetryPolicy, RetryState};
pub use scheduler::{ProbeSchedulerActor, SchedulerHandle};

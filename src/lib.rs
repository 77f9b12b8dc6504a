pub mod actors;
pub mod channel;
pub mod config;
pub mod probe;
pub mod queue;
pub mod resource;
pub mod storage;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use resource::{ResourceAddress, ResourceDescriptor, ResourceError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub chat_id: String,
    pub active: bool,
}

/// Result of a single probe attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl ProbeOutcome {
    pub fn now(success: bool) -> Self {
        Self {
            success,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only record of a resource that stayed unreachable for a full retry cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Assigned by the store
    pub id: i64,

    /// Resource that was escalated. The entry outlives the resource.
    pub resource_id: i64,

    pub created_at: DateTime<Utc>,
}

/// A single alert addressed to one subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Chat identifier of the subscriber
    pub destination: String,

    pub body: String,
}

impl NotificationMessage {
    pub fn new(destination: impl ToString, body: impl ToString) -> Self {
        Self {
            destination: destination.to_string(),
            body: body.to_string(),
        }
    }
}

/// A message handed out by a queue but not yet acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub id: i64,
    pub message: NotificationMessage,
}

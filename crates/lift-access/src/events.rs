//! Fire-and-forget notifications about occupancy and visitor status.
//!
//! Delivery is best-effort. Nothing in the access core depends on an
//! event being received.

use chrono::{DateTime, Utc};
use lift_core::models::access_log::{AccessMethod, Accessor};
use lift_core::models::visitor_access::AccessStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AccessEvent {
    OccupantEntered {
        accessor: Accessor,
        floor_id: Uuid,
        method: AccessMethod,
        at: DateTime<Utc>,
    },
    OccupantExited {
        accessor: Accessor,
        floor_id: Uuid,
        at: DateTime<Utc>,
    },
    VisitorStatusChanged {
        visitor_access_id: Uuid,
        visitor_name: String,
        status: AccessStatus,
        at: DateTime<Utc>,
    },
}

impl AccessEvent {
    /// JSON form handed to real-time transports.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Sink for [`AccessEvent`]s.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: AccessEvent);
}

/// Publishes onto a `tokio` broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<AccessEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AccessEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, event: AccessEvent) {
        // No subscribers is normal.
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            trace!(?event, "no event subscribers");
        }
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: AccessEvent) {}
}

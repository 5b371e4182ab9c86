//! Outbound notification interfaces.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::NotificationDispatchError;

/// Result of sending to one destination.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReport {
    pub destination: String,
    pub outcome: Result<(), NotificationDispatchError>,
}

impl DeliveryReport {
    pub fn delivered(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            outcome: Ok(()),
        }
    }

    pub fn failed(destination: impl Into<String>, error: NotificationDispatchError) -> Self {
        Self {
            destination: destination.into(),
            outcome: Err(error),
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Batched messaging (SMS or similar).
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Gateway identifier for logs.
    fn name(&self) -> &str;

    /// Send one body to many destinations.
    ///
    /// Returns one report per destination, or an error if the gateway could
    /// not accept the batch at all.
    async fn send_batch(
        &self,
        destinations: &[String],
        body: &str,
    ) -> Result<Vec<DeliveryReport>, NotificationDispatchError>;
}

/// Event pushed to a subject's open real-time channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    /// Event kind, e.g. `risk_alert`
    pub kind: String,
    pub payload: serde_json::Value,
}

/// Real-time push. Fire-and-forget: nothing is queued for offline subjects.
#[async_trait]
pub trait LivePush: Send + Sync {
    /// Deliver to every open channel of the subject; returns how many were reached.
    async fn push(&self, subject_id: &str, event: LiveEvent) -> usize;
}

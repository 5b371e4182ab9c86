//! Mock messaging gateway for testing and dry runs.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use super::traits::{DeliveryReport, MessagingGateway};
use crate::types::NotificationDispatchError;

/// A batch the mock accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentBatch {
    pub destinations: Vec<String>,
    pub body: String,
}

/// Configurable in-memory gateway.
///
/// Destinations can be set to fail a number of times (or forever), the
/// whole gateway can be made unavailable, and every call can be delayed.
pub struct MockMessagingGateway {
    name: String,
    available: AtomicBool,
    failures: DashMap<String, u32>,
    delay: Option<Duration>,
    sent: Mutex<Vec<SentBatch>>,
    call_count: AtomicU32,
}

impl MockMessagingGateway {
    pub fn new() -> Self {
        Self {
            name: "mock-messaging".to_string(),
            available: AtomicBool::new(true),
            failures: DashMap::new(),
            delay: None,
            sent: Mutex::new(Vec::new()),
            call_count: AtomicU32::new(0),
        }
    }

    /// Always reject this destination.
    pub fn failing(self, destination: impl Into<String>) -> Self {
        self.failures.insert(destination.into(), u32::MAX);
        self
    }

    /// Reject this destination for the next `times` attempts.
    pub fn failing_times(self, destination: impl Into<String>, times: u32) -> Self {
        self.failures.insert(destination.into(), times);
        self
    }

    /// Set availability.
    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Delay every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Batches accepted so far (including per-destination failures).
    pub async fn sent(&self) -> Vec<SentBatch> {
        self.sent.lock().await.clone()
    }

    /// Every destination that appeared in an accepted batch, in order.
    pub async fn destinations(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .flat_map(|b| b.destinations.iter().cloned())
            .collect()
    }

    /// Number of `send_batch` calls.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    fn should_fail(&self, destination: &str) -> bool {
        match self.failures.get_mut(destination) {
            Some(mut remaining) if *remaining > 0 => {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                true
            }
            _ => false,
        }
    }
}

impl Default for MockMessagingGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingGateway for MockMessagingGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_batch(
        &self,
        destinations: &[String],
        body: &str,
    ) -> Result<Vec<DeliveryReport>, NotificationDispatchError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(NotificationDispatchError::Unavailable(
                "Mock gateway disabled".to_string(),
            ));
        }

        self.sent.lock().await.push(SentBatch {
            destinations: destinations.to_vec(),
            body: body.to_string(),
        });

        let reports = destinations
            .iter()
            .map(|d| {
                if self.should_fail(d) {
                    DeliveryReport::failed(
                        d.clone(),
                        NotificationDispatchError::Rejected {
                            destination: d.clone(),
                            reason: "mock rejection".to_string(),
                        },
                    )
                } else {
                    DeliveryReport::delivered(d.clone())
                }
            })
            .collect();

        info!(gateway = %self.name, count = destinations.len(), "Mock batch sent");
        Ok(reports)
    }
}

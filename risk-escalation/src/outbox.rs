//! Delivery outbox.
//!
//! Sends a message to a set of destinations through the messaging gateway,
//! retrying destinations that failed with bounded exponential backoff. Each
//! gateway call runs under a deadline. Every final per-destination outcome
//! is kept in a bounded history.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::EscalationConfig;
use crate::gateway::{DeliveryReport, MessagingGateway};
use crate::types::NotificationDispatchError;

/// Maximum records kept in the outbox history.
const MAX_HISTORY: usize = 10_000;

/// Final outcome for one destination.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    pub destination: String,
    /// Alert the message belongs to
    pub alert_id: String,
    pub attempts: u32,
    pub error: Option<NotificationDispatchError>,
    pub completed_at: DateTime<Utc>,
}

impl OutboxRecord {
    pub fn delivered(&self) -> bool {
        self.error.is_none()
    }
}

/// Retrying front for a [`MessagingGateway`].
pub struct Outbox {
    gateway: Arc<dyn MessagingGateway>,
    config: EscalationConfig,
    history: Arc<RwLock<VecDeque<OutboxRecord>>>,
}

impl Outbox {
    pub fn new(gateway: Arc<dyn MessagingGateway>, config: EscalationConfig) -> Self {
        Self {
            gateway,
            config,
            history: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    /// Deliver `body` to every destination; returns one report per destination.
    pub async fn deliver(&self, alert_id: &str, destinations: &[String], body: &str) -> Vec<DeliveryReport> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut pending: Vec<String> = destinations.to_vec();
        let mut finished: Vec<(DeliveryReport, u32)> = Vec::with_capacity(destinations.len());
        let mut last_errors: Vec<DeliveryReport> = Vec::new();

        for attempt in 1..=max_attempts {
            if pending.is_empty() {
                break;
            }

            let delay = self.config.backoff_for(attempt);
            if !delay.is_zero() {
                debug!(alert_id = %alert_id, attempt, delay_ms = delay.as_millis() as u64, "Retrying delivery");
                tokio::time::sleep(delay).await;
            }

            let reports = self.attempt(&pending, body).await;
            last_errors.clear();
            for report in reports {
                if report.is_delivered() {
                    finished.push((report, attempt));
                } else {
                    last_errors.push(report);
                }
            }
            pending = last_errors.iter().map(|r| r.destination.clone()).collect();
        }

        for report in last_errors {
            if let Err(e) = &report.outcome {
                warn!(
                    alert_id = %alert_id,
                    gateway = %self.gateway.name(),
                    destination = %report.destination,
                    error = %e,
                    "Notification dispatch failed"
                );
            }
            finished.push((report, max_attempts));
        }

        self.record(alert_id, &finished).await;

        // report in the caller's destination order
        let mut ordered = Vec::with_capacity(destinations.len());
        for d in destinations {
            if let Some(pos) = finished.iter().position(|(r, _)| &r.destination == d) {
                ordered.push(finished.swap_remove(pos).0);
            }
        }
        ordered
    }

    /// One gateway call under the deadline.
    async fn attempt(&self, destinations: &[String], body: &str) -> Vec<DeliveryReport> {
        let timeout = self.config.dispatch_timeout();
        match tokio::time::timeout(timeout, self.gateway.send_batch(destinations, body)).await {
            Ok(Ok(reports)) => destinations
                .iter()
                .map(|d| {
                    reports
                        .iter()
                        .find(|r| &r.destination == d)
                        .cloned()
                        .unwrap_or_else(|| {
                            DeliveryReport::failed(
                                d.clone(),
                                NotificationDispatchError::Rejected {
                                    destination: d.clone(),
                                    reason: "no delivery report from gateway".to_string(),
                                },
                            )
                        })
                })
                .collect(),
            Ok(Err(e)) => destinations
                .iter()
                .map(|d| DeliveryReport::failed(d.clone(), e.clone()))
                .collect(),
            Err(_) => destinations
                .iter()
                .map(|d| {
                    DeliveryReport::failed(
                        d.clone(),
                        NotificationDispatchError::TimedOut {
                            destination: d.clone(),
                        },
                    )
                })
                .collect(),
        }
    }

    async fn record(&self, alert_id: &str, finished: &[(DeliveryReport, u32)]) {
        let now = Utc::now();
        let mut history = self.history.write().await;
        for (report, attempts) in finished {
            history.push_back(OutboxRecord {
                destination: report.destination.clone(),
                alert_id: alert_id.to_string(),
                attempts: *attempts,
                error: report.outcome.clone().err(),
                completed_at: now,
            });
        }
        while history.len() > MAX_HISTORY {
            history.pop_front();
        }
    }

    /// Most recent records, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<OutboxRecord> {
        let history = self.history.read().await;
        history.iter().rev().take(limit).cloned().collect()
    }
}

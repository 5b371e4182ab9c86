//! Configuration for escalation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::AlertSeverity;

/// Escalation and delivery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Severity given to new alerts
    pub severity: AlertSeverity,
    /// Maximum contacts notified per alert
    pub max_contacts: usize,
    /// Delivery attempts per destination (1 = no retry)
    pub max_attempts: u32,
    /// First retry delay (ms); doubles on each further attempt
    pub base_backoff_ms: u64,
    /// Upper bound on a single retry delay (ms)
    pub max_backoff_ms: u64,
    /// Deadline for one gateway call (ms)
    pub dispatch_timeout_ms: u64,
    /// Message sent to contacts. Placeholders: {{subject_id}}, {{risk_score}}, {{alert_id}}
    pub contact_template: String,
    /// Message sent to the subject. Same placeholders.
    pub subject_template: String,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            severity: AlertSeverity::Critical,
            max_contacts: 5,
            max_attempts: 3,
            base_backoff_ms: 500,
            max_backoff_ms: 8_000,
            dispatch_timeout_ms: 10_000,
            contact_template: "URGENT: {{subject_id}} has a high pregnancy risk assessment (score {{risk_score}}/100). Please check in with them and help them reach care now.".to_string(),
            subject_template: "Your latest health check shows HIGH risk (score {{risk_score}}/100). Contact your provider or emergency services now. Your emergency contacts are being notified.".to_string(),
        }
    }
}

impl EscalationConfig {
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    /// Delay before attempt `attempt` (1-based; the first attempt has none).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u64 << (attempt - 2).min(16);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(factor).min(self.max_backoff_ms))
    }
}

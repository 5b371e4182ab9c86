//! Core types for escalation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    #[default]
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

/// Lifecycle of an alert.
///
/// ```text
/// Active ──► ContactsNotified ──► Resolved
///   │  └──────────────────────────▲
///   └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    ContactsNotified,
    Resolved,
    Cancelled,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::ContactsNotified => "contacts_notified",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the alert still needs attention.
    pub fn is_open(&self) -> bool {
        matches!(self, AlertStatus::Active | AlertStatus::ContactsNotified)
    }

    /// Legal edges of the state machine.
    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Active, AlertStatus::ContactsNotified)
                | (AlertStatus::Active, AlertStatus::Resolved)
                | (AlertStatus::Active, AlertStatus::Cancelled)
                | (AlertStatus::ContactsNotified, AlertStatus::Resolved)
        )
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the background notification fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSummary {
    /// Contact destinations that accepted the message
    pub delivered: usize,
    /// Contact destinations that failed after every attempt
    pub failed: usize,
    /// Whether the subject's own channel accepted its message
    pub subject_notified: bool,
    /// Live channels the event reached
    pub live_pushes: usize,
}

/// An escalation incident. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub subject_id: String,
    /// Assessment that raised the alert
    pub assessment_id: String,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub contacts_notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Who resolved or cancelled the alert
    pub resolved_by: Option<String>,
    pub notification_summary: Option<NotificationSummary>,
}

impl Alert {
    /// A new Active alert.
    pub fn new(subject_id: impl Into<String>, assessment_id: impl Into<String>, severity: AlertSeverity) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: subject_id.into(),
            assessment_id: assessment_id.into(),
            severity,
            status: AlertStatus::Active,
            contacts_notified: false,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            resolved_by: None,
            notification_summary: None,
        }
    }

    /// Move to `next`, enforcing the state machine.
    pub fn transition(&mut self, next: AlertStatus, actor: Option<&str>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(EscalationError::InvalidTransition {
                alert_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }

        let now = Utc::now();
        self.status = next;
        self.updated_at = now;
        match next {
            AlertStatus::ContactsNotified => self.contacts_notified = true,
            AlertStatus::Resolved | AlertStatus::Cancelled => {
                self.resolved_at = Some(now);
                self.resolved_by = actor.map(str::to_string);
            }
            AlertStatus::Active => {}
        }
        Ok(())
    }
}

/// A notification target owned by the contacts subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default = "new_id")]
    pub id: String,
    pub subject_id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub is_primary: bool,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Contact {
    pub fn new(subject_id: impl Into<String>, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            subject_id: subject_id.into(),
            name: name.into(),
            phone: phone.into(),
            is_primary: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

/// Per-destination messaging failure. Logged and counted, never surfaced to
/// the request that triggered the escalation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationDispatchError {
    #[error("Destination {destination} rejected: {reason}")]
    Rejected { destination: String, reason: String },

    #[error("Delivery to {destination} timed out")]
    TimedOut { destination: String },

    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

/// Error types for escalation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EscalationError {
    #[error("Alert {0} not found")]
    AlertNotFound(String),

    #[error("Alert {alert_id} cannot move from {from} to {to}")]
    InvalidTransition {
        alert_id: String,
        from: AlertStatus,
        to: AlertStatus,
    },

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Contact directory error: {0}")]
    Directory(String),
}

pub type Result<T> = std::result::Result<T, EscalationError>;

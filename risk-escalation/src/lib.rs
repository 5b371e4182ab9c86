//! Escalation of high maternal risk.
//!
//! A High [`risk_assessment::RiskAssessment`] raises an [`Alert`] and
//! notifies the subject's contacts in the background:
//!
//! ```text
//! trigger ──► AlertRepository (one open alert per subject)
//!    │
//!    └─ spawn ──► ContactDirectory ──► Outbox ──► MessagingGateway
//!                                        │
//!                 subject message ───────┘
//!                 live event ──► LivePush
//! ```
//!
//! Alert lifecycle: `Active → ContactsNotified → Resolved`, with
//! `Active → Resolved` and `Active → Cancelled` also allowed.
//! Delivery failures are logged and counted, never returned to the caller
//! that triggered the escalation.

pub mod config;
pub mod contacts;
pub mod coordinator;
pub mod gateway;
pub mod outbox;
pub mod store;
pub mod types;

pub use config::EscalationConfig;
pub use contacts::{resolve_targets, ContactDirectory, InMemoryContactDirectory};
pub use coordinator::{DispatchStatsSnapshot, Escalation, EscalationCoordinator, RISK_ALERT_EVENT};
pub use gateway::{
    DeliveryReport, LiveChannel, LiveChannelRegistry, LiveEvent, LivePush, MessagingGateway,
    MockMessagingGateway,
};
pub use outbox::{Outbox, OutboxRecord};
pub use store::{AlertRepository, InMemoryAlertStore};
pub use types::*;

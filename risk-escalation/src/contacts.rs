//! Contact lookup and target resolution.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::types::{Contact, Result};

/// Read-only view of the contacts subsystem.
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn contacts_for(&self, subject_id: &str) -> Result<Vec<Contact>>;
}

/// In-memory directory.
#[derive(Default)]
pub struct InMemoryContactDirectory {
    contacts: DashMap<String, Vec<Contact>>,
}

impl InMemoryContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, contact: Contact) {
        self.contacts
            .entry(contact.subject_id.clone())
            .or_default()
            .push(contact);
    }

    pub fn with_contacts(self, contacts: impl IntoIterator<Item = Contact>) -> Self {
        for contact in contacts {
            self.add(contact);
        }
        self
    }
}

#[async_trait]
impl ContactDirectory for InMemoryContactDirectory {
    async fn contacts_for(&self, subject_id: &str) -> Result<Vec<Contact>> {
        Ok(self
            .contacts
            .get(subject_id)
            .map(|c| c.value().clone())
            .unwrap_or_default())
    }
}

/// Pick who to notify: primary contacts if there are any, otherwise any
/// contacts; at most `cap`, one per phone number, in directory order.
pub fn resolve_targets(contacts: &[Contact], cap: usize) -> Vec<Contact> {
    let has_primary = contacts.iter().any(|c| c.is_primary);

    let mut targets: Vec<Contact> = Vec::new();
    for contact in contacts.iter().filter(|c| !has_primary || c.is_primary) {
        if targets.len() >= cap {
            break;
        }
        if contact.phone.trim().is_empty() || targets.iter().any(|t| t.phone == contact.phone) {
            continue;
        }
        targets.push(contact.clone());
    }
    targets
}

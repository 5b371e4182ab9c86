//! Live channel registry.
//!
//! Tracks open real-time channels per subject. Shared by every handler, so
//! it is a concurrent map; a channel whose receiver has gone away is removed
//! on the next push instead of raising.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use super::traits::{LiveEvent, LivePush};

struct ChannelEntry {
    id: String,
    tx: mpsc::UnboundedSender<LiveEvent>,
}

/// Receiving half handed to a connected client.
pub struct LiveChannel {
    pub id: String,
    pub subject_id: String,
    rx: mpsc::UnboundedReceiver<LiveEvent>,
}

impl LiveChannel {
    /// Wait for the next event; `None` once the registry dropped the channel.
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<LiveEvent> {
        self.rx.try_recv().ok()
    }
}

/// Subject id → open channels.
pub struct LiveChannelRegistry {
    channels: DashMap<String, Vec<ChannelEntry>>,
    count: AtomicUsize,
}

impl LiveChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            count: AtomicUsize::new(0),
        }
    }

    /// Open a channel for a subject.
    pub fn connect(&self, subject_id: &str) -> LiveChannel {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = uuid::Uuid::new_v4().to_string();

        self.channels
            .entry(subject_id.to_string())
            .or_default()
            .push(ChannelEntry { id: id.clone(), tx });
        self.count.fetch_add(1, Ordering::Relaxed);

        debug!(subject_id = %subject_id, channel_id = %id, "Live channel connected");

        LiveChannel {
            id,
            subject_id: subject_id.to_string(),
            rx,
        }
    }

    /// Close a channel explicitly.
    pub fn disconnect(&self, subject_id: &str, channel_id: &str) {
        let removed = self
            .channels
            .get_mut(subject_id)
            .map(|mut entries| {
                let before = entries.len();
                entries.retain(|e| e.id != channel_id);
                before - entries.len()
            })
            .unwrap_or(0);
        self.forget(removed);
        self.channels.remove_if(subject_id, |_, entries| entries.is_empty());

        if removed > 0 {
            debug!(subject_id = %subject_id, channel_id = %channel_id, "Live channel disconnected");
        }
    }

    pub fn is_connected(&self, subject_id: &str) -> bool {
        self.channels
            .get(subject_id)
            .map(|entries| !entries.is_empty())
            .unwrap_or(false)
    }

    /// Open channels across all subjects.
    pub fn channel_count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    fn forget(&self, n: usize) {
        if n > 0 {
            self.count.fetch_sub(n, Ordering::Relaxed);
        }
    }
}

impl Default for LiveChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LivePush for LiveChannelRegistry {
    async fn push(&self, subject_id: &str, event: LiveEvent) -> usize {
        let Some(mut entries) = self.channels.get_mut(subject_id) else {
            debug!(subject_id = %subject_id, kind = %event.kind, "No live channel, event dropped");
            return 0;
        };

        let before = entries.len();
        entries.retain(|e| e.tx.send(event.clone()).is_ok());
        let delivered = entries.len();
        drop(entries);

        let closed = before - delivered;
        if closed > 0 {
            debug!(subject_id = %subject_id, closed, "Removed closed live channels");
            self.forget(closed);
            self.channels.remove_if(subject_id, |_, entries| entries.is_empty());
        }

        delivered
    }
}

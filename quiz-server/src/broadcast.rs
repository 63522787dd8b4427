use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use quiz_types::BroadcastEvent;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("broadcast gateway unavailable: {0}")]
    Unavailable(String),
}

/// Publish-only gateway for session events. Delivery is at most once and
/// nothing is replayed; clients recover through the snapshot endpoint.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, channel: &str, event: &BroadcastEvent) -> Result<(), BroadcastError>;
}

/// In-process fan-out with one bounded channel per channel name.
pub struct BroadcastHub {
    channels: DashMap<String, broadcast::Sender<Arc<str>>>,
    capacity: usize,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<Arc<str>> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Drops channels nobody listens to anymore. Returns how many were removed.
    pub fn prune_idle(&self) -> usize {
        let before = self.channels.len();
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
        before - self.channels.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[async_trait]
impl Broadcaster for BroadcastHub {
    async fn broadcast(&self, channel: &str, event: &BroadcastEvent) -> Result<(), BroadcastError> {
        let payload: Arc<str> = serde_json::to_string(event)?.into();

        let Some(sender) = self.channels.get(channel) else {
            tracing::trace!("No subscribers on {}", channel);
            return Ok(());
        };
        // No receivers left is not an error for a fire-and-forget publish
        let delivered = sender.send(payload).unwrap_or(0);
        tracing::debug!("Published to {} ({} subscribers)", channel, delivered);
        Ok(())
    }
}

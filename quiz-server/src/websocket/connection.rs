use std::fmt;
use std::time::Instant;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bookkeeping for one socket listening on one channel.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: SubscriberId,
    pub channel: String,
    pub connected_at: Instant,
    pub delivered: u64,
    pub skipped: u64,
}

impl Subscription {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            id: SubscriberId::new(),
            channel: channel.into(),
            connected_at: Instant::now(),
            delivered: 0,
            skipped: 0,
        }
    }

    pub fn record_delivery(&mut self) {
        self.delivered += 1;
    }

    pub fn record_lag(&mut self, missed: u64) {
        self.skipped += missed;
    }
}

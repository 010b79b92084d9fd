//! # Profile Change Publisher
//!
//! Broadcast side of the bus. Store adapters publish here after a commit.

use crate::events::{EventFilter, ProfileEvent};
use crate::subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionGuard};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Announces committed profile changes.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Broadcast `event`. Returns how many receivers it reached.
    async fn publish(&self, event: ProfileEvent) -> usize;

    /// Events handed to `publish` so far, delivered or not.
    fn events_published(&self) -> u64;
}

/// Process-local bus over a `tokio::sync::broadcast` channel.
pub struct InMemoryEventBus {
    tx: broadcast::Sender<ProfileEvent>,
    /// Live subscriptions per filter key.
    live_filters: Arc<RwLock<HashMap<String, usize>>>,
    published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus whose slowest receiver may fall `capacity` events behind before
    /// it skips ahead.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            live_filters: Arc::default(),
            published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Receive every event published from now on that `filter` accepts.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let rx = self.tx.subscribe();
        let key = format!("{:?}/{:?}", filter.topics, filter.users);

        *self.live_filters.write().entry(key.clone()).or_default() += 1;
        debug!(topics = ?filter.topics, users = filter.users.len(), "Subscribed");

        let guard = SubscriptionGuard::new(Arc::clone(&self.live_filters), key);
        Subscription::new(rx, filter, guard)
    }

    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        self.subscribe(filter).into_stream()
    }

    /// Receivers currently attached, including streams.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Number of distinct filters with at least one live subscription.
    #[must_use]
    pub fn active_filters(&self) -> usize {
        self.live_filters.read().len()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: ProfileEvent) -> usize {
        let topic = event.topic();
        self.published.fetch_add(1, Ordering::Relaxed);

        // No receivers is not an error: observers re-read the store when they attach.
        let reached = self.tx.send(event).unwrap_or(0);
        debug!(?topic, receivers = reached, "Profile event published");
        reached
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }
}

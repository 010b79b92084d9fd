//! # Profile Change Subscriptions
//!
//! Receiving side of the bus. A subscriber that falls more than the channel
//! capacity behind skips ahead and keeps going; callers re-read the store, so
//! missed events only delay convergence.

use crate::events::{EventFilter, ProfileEvent};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus closed")]
    Closed,
}

/// Anything profile-change observers can attach to.
pub trait EventSubscriber: Send + Sync {
    fn subscribe(&self, filter: EventFilter) -> Subscription;
}

/// Keeps the bus's per-filter count of live subscriptions accurate.
pub(crate) struct SubscriptionGuard {
    live_filters: Arc<RwLock<HashMap<String, usize>>>,
    key: String,
}

impl SubscriptionGuard {
    pub(crate) fn new(live_filters: Arc<RwLock<HashMap<String, usize>>>, key: String) -> Self {
        Self { live_filters, key }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let mut live = self.live_filters.write();
        let remaining = live.get_mut(&self.key).map(|n| {
            *n = n.saturating_sub(1);
            *n
        });
        if remaining == Some(0) {
            live.remove(&self.key);
        }
        debug!(filter = %self.key, "Unsubscribed");
    }
}

/// Filtered receiver. Unsubscribes on drop.
pub struct Subscription {
    rx: broadcast::Receiver<ProfileEvent>,
    filter: EventFilter,
    guard: SubscriptionGuard,
}

impl Subscription {
    pub(crate) fn new(
        rx: broadcast::Receiver<ProfileEvent>,
        filter: EventFilter,
        guard: SubscriptionGuard,
    ) -> Self {
        Self { rx, filter, guard }
    }

    /// Next accepted event. `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<ProfileEvent> {
        use broadcast::error::RecvError;
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Subscriber fell behind, skipping ahead");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next accepted event if one is already queued.
    pub fn try_recv(&mut self) -> Result<Option<ProfileEvent>, SubscriptionError> {
        use broadcast::error::TryRecvError;
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    #[must_use]
    pub fn into_stream(self) -> EventStream {
        EventStream {
            inner: BroadcastStream::new(self.rx),
            filter: self.filter,
            _guard: self.guard,
        }
    }
}

/// `Stream` of accepted events, for combinator-style consumers.
pub struct EventStream {
    inner: BroadcastStream<ProfileEvent>,
    filter: EventFilter,
    _guard: SubscriptionGuard,
}

impl EventStream {
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = ProfileEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let event = match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    debug!(skipped, "Stream fell behind, skipping ahead");
                    continue;
                }
                Poll::Ready(Some(Ok(event))) => event,
            };
            if self.filter.matches(&event) {
                return Poll::Ready(Some(event));
            }
        }
    }
}

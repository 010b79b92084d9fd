//! # Shared Bus - Profile Change Notifications
//!
//! Broadcasts profile changes from the profile store to in-process observers
//! such as the dashboard mirror.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────────┐
//! │ Profile      │    publish()       │ Dashboard mirror │
//! │ store        │ ──────┐            │                  │
//! └──────────────┘       │            └──────────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery
//!
//! - At-least-once, unordered across publishers.
//! - A lagging subscriber skips ahead; observers re-read the store on every
//!   event instead of merging payloads.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, ProfileEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

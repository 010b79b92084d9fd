//! # RF-03 Community Card
//!
//! Read model over profiles: the unlock rule, referral progress, the
//! per-user dashboard and admin statistics.
//!
//! ## Unlock Rule
//!
//! A profile is unlocked once `referral_count >= 5`. The flag is derived on
//! every read and never stored, so it cannot drift from the counter.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`)
//!   - `ReferralProgress`, `CommunityCard`: derived from one profile
//!   - `DashboardView`, `AdminOverview`: page-level views
//! - **Ports Layer** (`ports/`)
//!   - `DashboardApi`: Driving port
//!   - `ProfileDirectory`: Driven port (read-only profile access)
//! - **Service Layer** (`service/`)
//!   - `DashboardService`: assembles views, ensures the QR image
//!   - `DashboardMirror`: keeps one dashboard current from bus events
//!
//! ```text
//! ProfileEvent ──► DashboardMirror ──► DashboardApi::dashboard ──► watch::Sender
//!                  (any event = full re-read)
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{
    is_unlocked, newest_first, unlocked_at, AdminOverview, AdminProfileRow, CommunityCard,
    DashboardView, ReferralEntry, ReferralProgress,
};
pub use error::DashboardError;
pub use ports::{DashboardApi, ProfileDirectory};
pub use service::{DashboardMirror, DashboardService};

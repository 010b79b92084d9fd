//! Domain Layer
//!
//! Pure read-model logic: the unlock rule and the views built from profiles.

pub mod unlock;
pub mod views;

pub use unlock::{is_unlocked, unlocked_at, ReferralProgress};
pub use views::{
    newest_first, AdminOverview, AdminProfileRow, CommunityCard, DashboardView, ReferralEntry,
};

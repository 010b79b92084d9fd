//! Community card unlock rule and referral progress
//!
//! Unlock state is derived from `referral_count` on every read and never
//! stored, so an increment flips it without a second write.

use serde::{Deserialize, Serialize};
use shared_types::{Profile, REFERRAL_THRESHOLD};

/// Whether the profile has earned the community card.
#[must_use]
pub fn is_unlocked(profile: &Profile) -> bool {
    unlocked_at(profile.referral_count)
}

/// Unlock rule on a bare count.
#[must_use]
pub fn unlocked_at(referral_count: u32) -> bool {
    referral_count >= REFERRAL_THRESHOLD
}

/// Progress toward the community card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralProgress {
    pub count: u32,
    pub threshold: u32,
    /// Referrals still needed. Zero once unlocked.
    pub remaining: u32,
    /// Percent toward the threshold, capped at 100.
    pub percent: u32,
    pub unlocked: bool,
}

impl ReferralProgress {
    #[must_use]
    pub fn for_count(count: u32) -> Self {
        let threshold = REFERRAL_THRESHOLD;
        let percent = (u64::from(count) * 100 / u64::from(threshold)).min(100) as u32;
        Self {
            count,
            threshold,
            remaining: threshold.saturating_sub(count),
            percent,
            unlocked: unlocked_at(count),
        }
    }

    #[must_use]
    pub fn for_profile(profile: &Profile) -> Self {
        Self::for_count(profile.referral_count)
    }
}

//! # Profile Events
//!
//! Defines all event types that flow through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::entities::{ReferralCode, UserId};

/// All events that can be published to the event bus.
///
/// Payloads carry identifiers only. Subscribers re-read the store for the
/// current row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileEvent {
    // =========================================================================
    // PROFILES
    // =========================================================================
    /// A profile row was inserted.
    ProfileCreated {
        profile_id: UserId,
        referral_code: ReferralCode,
    },

    /// A profile row changed (QR URL, referral count).
    ProfileUpdated { profile_id: UserId },

    // =========================================================================
    // REFERRALS
    // =========================================================================
    /// A referral link was applied and the referrer's count incremented.
    ReferralApplied {
        referrer_id: UserId,
        referred_id: UserId,
    },
}

impl ProfileEvent {
    /// Topic used for subscription filtering.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::ProfileCreated { .. } | Self::ProfileUpdated { .. } => EventTopic::Profiles,
            Self::ReferralApplied { .. } => EventTopic::Referrals,
        }
    }

    /// Whether the event changes the row or referral list of `user`.
    #[must_use]
    pub fn concerns(&self, user: &UserId) -> bool {
        match self {
            Self::ProfileCreated { profile_id, .. } | Self::ProfileUpdated { profile_id } => {
                profile_id == user
            }
            Self::ReferralApplied {
                referrer_id,
                referred_id,
            } => referrer_id == user || referred_id == user,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Profile rows inserted or updated.
    Profiles,
    /// Referral links applied.
    Referrals,
    /// All events (no filtering).
    All,
}

/// Which events a subscription accepts. Both criteria must hold.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Users the event must concern. Empty means every user.
    pub users: Vec<UserId>,
}

impl EventFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            users: Vec::new(),
        }
    }

    /// Events touching `user`'s row or referral list.
    #[must_use]
    pub fn for_user(user: UserId) -> Self {
        Self {
            topics: Vec::new(),
            users: vec![user],
        }
    }

    #[must_use]
    pub fn matches(&self, event: &ProfileEvent) -> bool {
        let topic = event.topic();
        let wanted_topic = self.topics.is_empty()
            || self
                .topics
                .iter()
                .any(|t| *t == EventTopic::All || *t == topic);

        wanted_topic && (self.users.is_empty() || self.users.iter().any(|u| event.concerns(u)))
    }
}

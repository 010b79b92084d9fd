//! Referral lookup results and the registration outcome

use serde::{Deserialize, Serialize};
use shared_types::{Profile, SessionState, UserId};

/// Result of checking a submitted referral code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferralLookup {
    /// Nothing left after normalization. No referral requested.
    Empty,
    /// The code belongs to this referrer.
    Found(UserId),
    /// The store knows no profile with this code.
    NotFound,
}

/// What happened to the referral part of a registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReferralStatus {
    /// No code was submitted.
    NotRequested,
    /// Link applied and the referrer's count incremented.
    Applied { referrer_id: UserId },
    /// The code matched no profile.
    InvalidCode,
    /// The lookup mechanism failed; registration continued without a referral.
    LookupUnavailable,
    /// The code resolved to the new user. Skipped.
    SelfReferral,
    /// The profile already had a referrer. Left unchanged.
    AlreadyReferred { referrer_id: UserId },
    /// The apply procedure failed.
    NotCounted { referrer_id: UserId },
}

impl ReferralStatus {
    /// User-facing warning for this status, if any.
    #[must_use]
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            ReferralStatus::InvalidCode => Some("Invalid referral code"),
            ReferralStatus::NotCounted { .. } => Some("Referral not counted"),
            _ => None,
        }
    }
}

/// Successful registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationOutcome {
    pub profile: Profile,
    /// `SignedIn` or `PendingConfirmation`.
    pub session: SessionState,
    pub referral: ReferralStatus,
}

impl RegistrationOutcome {
    /// Non-blocking messages to show alongside the success.
    #[must_use]
    pub fn warnings(&self) -> Vec<&'static str> {
        self.referral.warning().into_iter().collect()
    }

    /// Whether the account still needs email confirmation.
    #[must_use]
    pub fn is_pending_confirmation(&self) -> bool {
        matches!(self.session, SessionState::PendingConfirmation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invalid_and_not_counted_warn() {
        let id = UserId::new_v4();
        assert_eq!(
            ReferralStatus::InvalidCode.warning(),
            Some("Invalid referral code")
        );
        assert_eq!(
            ReferralStatus::NotCounted { referrer_id: id }.warning(),
            Some("Referral not counted")
        );
        assert_eq!(ReferralStatus::LookupUnavailable.warning(), None);
        assert_eq!(ReferralStatus::SelfReferral.warning(), None);
        assert_eq!(ReferralStatus::Applied { referrer_id: id }.warning(), None);
    }
}

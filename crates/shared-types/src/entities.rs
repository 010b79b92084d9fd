//! # Core Domain Entities
//!
//! Defines the profile model and its identifiers.
//!
//! ## Clusters
//!
//! - **Identity**: `UserId`
//! - **Referral**: `ReferralCode`
//! - **Profile**: `Profile`, `NewProfile`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Identifier of a registered user.
///
/// The profile id and the identity provider's user id are the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id from its textual form.
    pub fn parse(value: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(value.trim()).map(Self)
    }

    /// Underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

// =============================================================================
// CLUSTER B: REFERRAL CODES
// =============================================================================

/// A short, unique, case-insensitive string identifying a referrer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferralCode(String);

impl ReferralCode {
    /// Normalize raw user input into a code.
    ///
    /// Trims, removes every whitespace character and lowercases. Returns
    /// `None` when nothing is left, which callers treat as "no referral".
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let code: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        if code.is_empty() {
            None
        } else {
            Some(Self(code))
        }
    }

    /// Wrap a code exactly as the store returned it.
    #[must_use]
    pub fn from_stored(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Placeholder code used when a profile row has to be inserted directly.
    ///
    /// Derived from the user id, so it is unique whenever ids are.
    #[must_use]
    pub fn placeholder_for(id: &UserId) -> Self {
        Self(format!("tmp{}", id.0.simple()))
    }

    /// Whether this is a placeholder assigned by the direct-insert fallback.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with("tmp") && self.0.len() == 35
    }

    /// Case-insensitive comparison against another code.
    #[must_use]
    pub fn matches(&self, other: &ReferralCode) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CLUSTER C: PROFILES
// =============================================================================

/// One registered user as persisted by the profile store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Primary key, equal to the identity provider's user id.
    pub id: UserId,
    /// Display name captured at sign-up.
    #[serde(default)]
    pub name: Option<String>,
    /// Phone number captured at sign-up.
    #[serde(default)]
    pub phone: Option<String>,
    /// Code other users enter to be referred by this profile.
    pub referral_code: ReferralCode,
    /// Referrer of this profile. Set at most once.
    #[serde(default)]
    pub referred_by: Option<UserId>,
    /// Number of profiles whose `referred_by` is this profile.
    #[serde(default)]
    pub referral_count: u32,
    /// Cached QR image of this profile's referral link.
    #[serde(default)]
    pub qr_code_url: Option<String>,
    /// Creation time of the row.
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Whether a referrer has already been linked.
    #[must_use]
    pub fn is_referred(&self) -> bool {
        self.referred_by.is_some()
    }

    /// Display name, or an empty string when none was captured.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

/// Row written by the direct-insert fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: UserId,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub referral_code: ReferralCode,
}

impl NewProfile {
    /// Build a row with a placeholder referral code.
    #[must_use]
    pub fn with_placeholder_code(id: UserId, name: Option<String>, phone: Option<String>) -> Self {
        Self {
            id,
            name,
            phone,
            referral_code: ReferralCode::placeholder_for(&id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_trims_and_lowercases() {
        let code = ReferralCode::normalize(" ab12cd34 ").unwrap();
        assert_eq!(code.as_str(), "ab12cd34");

        let upper = ReferralCode::normalize("AB12CD34").unwrap();
        assert_eq!(upper, code);
    }

    #[test]
    fn test_normalize_strips_internal_whitespace() {
        let code = ReferralCode::normalize("ab 12\tcd\n34").unwrap();
        assert_eq!(code.as_str(), "ab12cd34");
    }

    #[test]
    fn test_normalize_empty_is_none() {
        assert!(ReferralCode::normalize("").is_none());
        assert!(ReferralCode::normalize("   \t ").is_none());
    }

    #[test]
    fn test_matches_ignores_case() {
        let stored = ReferralCode::from_stored("xyz123");
        let entered = ReferralCode::from_stored("XYZ123");
        assert!(stored.matches(&entered));
    }

    #[test]
    fn test_placeholder_code_is_unique_per_user() {
        let a = UserId::new_v4();
        let b = UserId::new_v4();
        let code_a = ReferralCode::placeholder_for(&a);

        assert!(code_a.is_placeholder());
        assert_ne!(code_a, ReferralCode::placeholder_for(&b));
        assert_eq!(code_a, ReferralCode::placeholder_for(&a));
    }

    #[test]
    fn test_profile_deserializes_with_nulls() {
        let id = UserId::new_v4();
        let json = serde_json::json!({
            "id": id,
            "name": null,
            "phone": null,
            "referral_code": "xyz123",
            "referred_by": null,
            "referral_count": 2,
            "qr_code_url": null,
            "created_at": "2024-03-01T10:00:00Z",
        });

        let profile: Profile = serde_json::from_value(json).unwrap();
        assert_eq!(profile.id, id);
        assert_eq!(profile.referral_count, 2);
        assert!(!profile.is_referred());
        assert_eq!(profile.display_name(), "");
    }

    proptest! {
        #[test]
        fn prop_normalized_code_has_no_whitespace_or_uppercase(raw in "\\PC{0,24}") {
            if let Some(code) = ReferralCode::normalize(&raw) {
                prop_assert!(!code.as_str().chars().any(char::is_whitespace));
                prop_assert!(!code.as_str().chars().any(char::is_uppercase));
            }
        }

        #[test]
        fn prop_normalize_is_idempotent(raw in "[ a-zA-Z0-9\\t]{0,16}") {
            if let Some(code) = ReferralCode::normalize(&raw) {
                let again = ReferralCode::normalize(code.as_str()).unwrap();
                prop_assert_eq!(again, code);
            }
        }
    }
}

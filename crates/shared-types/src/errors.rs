//! # Error Types
//!
//! Defines the errors returned by the platform ports (identity provider and
//! profile store). Subsystem crates wrap these in their own error enums.

use thiserror::Error;

/// Errors that can occur in the profile store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store could not be reached or returned a server failure.
    #[error("Profile store unavailable: {0}")]
    Unavailable(String),

    /// No row matched.
    #[error("Profile not found: {0}")]
    NotFound(String),

    /// A row with the same primary key already exists.
    #[error("Profile already exists: {0}")]
    AlreadyExists(String),

    /// The referral code is already used by another profile.
    #[error("Referral code already taken: {0}")]
    CodeTaken(String),

    /// The store refused the request (constraint or permission failure).
    #[error("Request rejected by profile store: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Whether the error means "the row is already there".
    ///
    /// Insert conflicts are treated as success by the provisioning fallbacks.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }
}

/// Errors that can occur in the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Email/password pair did not match.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Account exists but its email has not been confirmed yet.
    #[error("Email not confirmed")]
    EmailNotConfirmed,

    /// Too many requests in a short window.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// An account with this email already exists.
    #[error("User already registered")]
    AlreadyRegistered,

    /// Provider rejected the input (weak password, malformed email).
    #[error("{0}")]
    InvalidInput(String),

    /// Provider could not be reached.
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    /// Any other provider failure.
    #[error("Identity provider error: {0}")]
    Provider(String),
}

impl IdentityError {
    /// Whether the caller supplied something the provider refused.
    #[must_use]
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            IdentityError::AlreadyRegistered | IdentityError::InvalidInput(_)
        )
    }
}

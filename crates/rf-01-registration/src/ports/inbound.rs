//! Inbound Ports (Driving Ports)
//!
//! The API other components (the HTTP gateway, tests) use to drive
//! registration and sessions.

use async_trait::async_trait;
use shared_types::{Session, SessionState};

use crate::domain::{LoginForm, ReferralLookup, RegistrationForm, RegistrationOutcome};
use crate::error::{ReferralLookupUnavailable, RegistrationError, SessionError};

/// Primary registration API (Driving Port)
#[async_trait]
pub trait RegistrationApi: Send + Sync {
    /// Run the full registration workflow for a caller in `state`.
    ///
    /// # Errors
    /// - `UserInput`, `AlreadySignedIn`: nothing was created
    /// - `RateLimited`, `IdentityCreation`, `MissingUserId`: identity step failed
    /// - `ProfileProvisioning`: identity exists but no profile row could be established
    async fn register(
        &self,
        state: &SessionState,
        form: RegistrationForm,
    ) -> Result<RegistrationOutcome, RegistrationError>;

    /// Check a raw referral code without registering.
    async fn validate_referral_code(
        &self,
        raw: &str,
    ) -> Result<ReferralLookup, ReferralLookupUnavailable>;
}

/// Session API (Driving Port)
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Sign in with email and password.
    async fn sign_in(&self, form: LoginForm) -> Result<SessionState, SessionError>;

    /// Sign out. Always ends in `SignedOut`.
    async fn sign_out(&self, session: &Session) -> SessionState;

    /// Resolve a bearer token (if any) to the caller's state.
    async fn current_session(&self, access_token: Option<&str>) -> SessionState;
}

//! Error types for the Registration subsystem

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Provisioning sub-step whose failure ended profile provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStep {
    /// Waiting for the store trigger to create the row.
    AwaitTrigger,
    /// The `create_profile` procedure.
    CreateProcedure,
    /// The direct insert with a placeholder code.
    DirectInsert,
}

impl fmt::Display for ProvisioningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisioningStep::AwaitTrigger => "await_trigger",
            ProvisioningStep::CreateProcedure => "create_procedure",
            ProvisioningStep::DirectInsert => "direct_insert",
        };
        f.write_str(name)
    }
}

/// Errors that end a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Form or provider rejected the caller's input. Message is user-facing.
    #[error("{0}")]
    UserInput(String),

    #[error("Already signed in")]
    AlreadySignedIn,

    #[error("Too many sign-up attempts. Please try again later")]
    RateLimited,

    #[error("Failed to create account: {0}")]
    IdentityCreation(String),

    #[error("Failed to create user")]
    MissingUserId,

    #[error("Profile provisioning failed at {failed_step}: {detail}")]
    ProfileProvisioning {
        failed_step: ProvisioningStep,
        detail: String,
    },
}

/// The referral lookup mechanism itself failed.
///
/// Never shown to the user; registration proceeds without a referral.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Referral lookup unavailable: {0}")]
pub struct ReferralLookupUnavailable(pub String);

/// Errors from the session service. Messages are user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{0}")]
    UserInput(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Please confirm your email before logging in")]
    EmailNotConfirmed,

    #[error("Too many login attempts. Please try again later")]
    RateLimited,

    #[error("Session not established. Please try again.")]
    SessionNotEstablished,

    #[error("Authentication failed: {0}")]
    Provider(String),
}

/// Invalid registration configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Profile poll schedule must contain at least one check")]
    EmptyPollSchedule,

    #[error("Profile poll delay too long: {millis} ms > {max} ms")]
    PollDelayTooLong { millis: u128, max: u128 },

    #[error("Minimum password length must be at least {min}, got {got}")]
    PasswordLengthTooShort { min: usize, got: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioning_error_names_step() {
        let err = RegistrationError::ProfileProvisioning {
            failed_step: ProvisioningStep::DirectInsert,
            detail: "store unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "Profile provisioning failed at direct_insert: store unavailable"
        );
    }

    #[test]
    fn test_session_messages() {
        assert_eq!(
            SessionError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
        assert_eq!(
            SessionError::SessionNotEstablished.to_string(),
            "Session not established. Please try again."
        );
    }
}

//! Domain Layer
//!
//! Pure registration logic: configuration, input checks and result types.

pub mod config;
pub mod form;
pub mod outcome;

pub use config::{RegistrationConfig, MAX_POLL_DELAY, PROVIDER_MIN_PASSWORD_LEN};
pub use form::{LoginForm, RegistrationForm, ValidatedRegistration};
pub use outcome::{ReferralLookup, ReferralStatus, RegistrationOutcome};

//! # RF-01 Registration
//!
//! Turns a sign-up form with an optional referral code into an identity, a
//! profile row and, when the code is valid, a counted referral link.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `RegistrationForm`, `LoginForm`: input checks
//!   - `ReferralLookup`, `ReferralStatus`, `RegistrationOutcome`: results
//!   - `RegistrationConfig`: poll schedule and password rules
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `RegistrationApi`, `SessionApi`: Driving ports (inbound API)
//!   - `IdentityProvider`, `ProfileStore`: Driven ports (platform)
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `ReferralCodeValidator`: normalization + store lookup
//!   - `RegistrationService`: implements `RegistrationApi`
//!   - `SessionService`: implements `SessionApi`
//!
//! ## Failure Model
//!
//! | Step | On failure |
//! |------|------------|
//! | Referral lookup | continue without referral (`InvalidCode` warns, `LookupUnavailable` is silent) |
//! | Identity creation | fatal |
//! | Profile provisioning | fatal after polling and both fallbacks |
//! | Referral application | continue, warn "Referral not counted" |
//!
//! ## Invariants
//!
//! - A profile's `referred_by` is set at most once; retries never overwrite it.
//! - The link and the referrer's count change in one store-side procedure.
//! - A user is never recorded as their own referrer.
//!
//! ## Usage Example
//!
//! ```ignore
//! use rf_01_registration::{RegistrationApi, RegistrationForm, RegistrationService};
//! use shared_types::SessionState;
//!
//! let service = RegistrationService::new(identity, store);
//! let outcome = service
//!     .register(&SessionState::SignedOut, form.with_query_ref(Some("xyz123")))
//!     .await?;
//! for warning in outcome.warnings() {
//!     println!("{warning}");
//! }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{
    LoginForm, ReferralLookup, ReferralStatus, RegistrationConfig, RegistrationForm,
    RegistrationOutcome,
};
pub use error::{
    ConfigError, ProvisioningStep, ReferralLookupUnavailable, RegistrationError, SessionError,
};
pub use ports::{
    IdentityProvider, ProfileStore, RegistrationApi, SessionApi, SignUpMetadata, SignUpRequest,
    SignUpResult,
};
pub use service::{ReferralCodeValidator, RegistrationService, SessionService};

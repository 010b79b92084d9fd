//! # Shared Types Crate
//!
//! This crate contains the domain entities and port error types used by every
//! Referral-Hub subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Profile`, `ReferralCode` and `SessionState`
//!   are defined here and nowhere else.
//! - **Canonical Codes**: a `ReferralCode` built from user input is always
//!   normalized (trimmed, internal whitespace removed, lowercased). Codes read
//!   back from the store keep the canonical form fixed at creation.
//! - **Explicit Sessions**: session state is a value passed into services,
//!   never an ambient global.

pub mod entities;
pub mod errors;
pub mod session;

pub use entities::*;
pub use errors::*;
pub use session::*;

/// Number of successful referrals needed to unlock the community card.
pub const REFERRAL_THRESHOLD: u32 = 5;

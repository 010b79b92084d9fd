//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - API for external callers
//! - Driven Ports (outbound) - Dependencies on the platform

pub mod inbound;
pub mod outbound;

pub use inbound::{RegistrationApi, SessionApi};
pub use outbound::{IdentityProvider, ProfileStore, SignUpMetadata, SignUpRequest, SignUpResult};

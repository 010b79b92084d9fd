//! Service Layer
//!
//! Orchestrates domain logic over the platform ports.

pub mod registration_service;
pub mod session_service;
pub mod validator;

pub use registration_service::RegistrationService;
pub use session_service::SessionService;
pub use validator::ReferralCodeValidator;

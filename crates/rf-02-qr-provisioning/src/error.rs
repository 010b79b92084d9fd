//! Error types for QR provisioning

use shared_types::StoreError;
use thiserror::Error;

/// Errors that can occur while building links or QR images.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QrError {
    #[error("Invalid public origin: {0}")]
    InvalidOrigin(String),

    #[error("Invalid QR options: {0}")]
    InvalidOptions(String),

    #[error("QR encoding failed: {0}")]
    Encoding(String),

    #[error("Profile has no referral code")]
    MissingReferralCode,

    #[error("Failed to store QR code: {0}")]
    Store(#[from] StoreError),
}

//! Inbound Ports (Driving Ports)

use async_trait::async_trait;
use shared_types::{Profile, ReferralCode};

use crate::error::QrError;

/// QR provisioning API (Driving Port)
#[async_trait]
pub trait QrProvisioningApi: Send + Sync {
    /// Return the profile's QR image, generating and persisting it once.
    ///
    /// Failures are logged and yield `None`. A concurrent call for the same
    /// profile also yields `None`; the caller re-reads the profile later.
    async fn ensure_qr_code(&self, profile: &Profile) -> Option<String>;

    /// QR image for the generic registration link. Not persisted.
    fn global_qr_code(&self) -> Result<String, QrError>;

    /// `<origin>/register?ref=<code>`
    fn referral_link(&self, code: &ReferralCode) -> String;

    /// `<origin>/register`
    fn registration_link(&self) -> String;

    /// WhatsApp share URL inviting through `code`.
    fn referral_share_url(&self, code: &ReferralCode) -> String;

    /// WhatsApp share URL for the generic registration link.
    fn registration_share_url(&self) -> String;
}

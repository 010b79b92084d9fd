//! Referral, registration and share links

use shared_types::ReferralCode;
use url::{form_urlencoded, Url};

use crate::error::QrError;

const WHATSAPP_BASE: &str = "https://wa.me/";

/// Builds links relative to the public origin of the front-end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkBuilder {
    origin: String,
}

impl LinkBuilder {
    /// `origin` must be an absolute http(s) URL. Any path is dropped.
    pub fn new(origin: &str) -> Result<Self, QrError> {
        let url = Url::parse(origin.trim()).map_err(|e| QrError::InvalidOrigin(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(QrError::InvalidOrigin(origin.to_string()));
        }
        Ok(Self {
            origin: url.origin().ascii_serialization(),
        })
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// `<origin>/register`
    #[must_use]
    pub fn registration_link(&self) -> String {
        format!("{}/register", self.origin)
    }

    /// `<origin>/register?ref=<code>`
    #[must_use]
    pub fn referral_link(&self, code: &ReferralCode) -> String {
        let encoded: String = form_urlencoded::byte_serialize(code.as_str().as_bytes()).collect();
        format!("{}/register?ref={}", self.origin, encoded)
    }

    /// Share text inviting someone through a personal referral link.
    #[must_use]
    pub fn referral_share_text(&self, code: &ReferralCode) -> String {
        format!(
            "Join our community! Use my referral link: {}",
            self.referral_link(code)
        )
    }

    /// Share text for the generic registration link.
    #[must_use]
    pub fn registration_share_text(&self) -> String {
        format!(
            "Join our exclusive AI-Driven Business Community! Scan the QR code or use this link: {}",
            self.registration_link()
        )
    }
}

/// `https://wa.me/?text=<text>` with the text percent-encoded.
#[must_use]
pub fn whatsapp_share_url(text: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(text.as_bytes()).collect();
    // Literal '+' is already escaped as %2B, so any '+' left is a space.
    format!("{WHATSAPP_BASE}?text={}", encoded.replace('+', "%20"))
}

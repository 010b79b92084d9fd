//! QR Provisioning Service
//!
//! Memoizes one QR image per profile. The image encodes the profile's
//! referral link, so concurrent writers store identical content.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{Profile, ReferralCode, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{whatsapp_share_url, LinkBuilder, QrOptions};
use crate::error::QrError;
use crate::ports::{QrCodeStore, QrEncoder, QrProvisioningApi};

/// Marks a profile as having a generation in progress until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<UserId>>,
    id: UserId,
}

impl<'a> InFlight<'a> {
    fn acquire(set: &'a Mutex<HashSet<UserId>>, id: UserId) -> Option<Self> {
        if set.lock().insert(id) {
            Some(Self { set, id })
        } else {
            None
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

pub struct QrProvisioningService<E: QrEncoder, S: QrCodeStore> {
    encoder: Arc<E>,
    store: Arc<S>,
    links: LinkBuilder,
    options: QrOptions,
    in_flight: Mutex<HashSet<UserId>>,
}

impl<E: QrEncoder, S: QrCodeStore> QrProvisioningService<E, S> {
    pub fn new(
        encoder: Arc<E>,
        store: Arc<S>,
        links: LinkBuilder,
        options: QrOptions,
    ) -> Result<Self, QrError> {
        options.validate()?;
        Ok(Self {
            encoder,
            store,
            links,
            options,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    #[must_use]
    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Number of generations currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }
}

#[async_trait]
impl<E, S> QrProvisioningApi for QrProvisioningService<E, S>
where
    E: QrEncoder + 'static,
    S: QrCodeStore + 'static,
{
    async fn ensure_qr_code(&self, profile: &Profile) -> Option<String> {
        if let Some(existing) = &profile.qr_code_url {
            return Some(existing.clone());
        }
        if profile.referral_code.as_str().is_empty() {
            warn!(user = %profile.id, "No referral code, skipping QR generation");
            return None;
        }

        let Some(_guard) = InFlight::acquire(&self.in_flight, profile.id) else {
            debug!(user = %profile.id, "QR generation already in flight");
            return None;
        };

        let link = self.links.referral_link(&profile.referral_code);
        let image = match self.encoder.encode(&link, &self.options) {
            Ok(image) => image,
            Err(e) => {
                warn!(user = %profile.id, error = %e, "QR encoding failed");
                return None;
            }
        };

        if let Err(e) = self.store.save_qr_code_url(&profile.id, &image).await {
            warn!(user = %profile.id, error = %e, "Failed to store QR code");
            return None;
        }

        info!(user = %profile.id, bytes = image.len(), "QR code generated");
        Some(image)
    }

    fn global_qr_code(&self) -> Result<String, QrError> {
        self.encoder
            .encode(&self.links.registration_link(), &self.options)
    }

    fn referral_link(&self, code: &ReferralCode) -> String {
        self.links.referral_link(code)
    }

    fn registration_link(&self) -> String {
        self.links.registration_link()
    }

    fn referral_share_url(&self, code: &ReferralCode) -> String {
        whatsapp_share_url(&self.links.referral_share_text(code))
    }

    fn registration_share_url(&self) -> String {
        whatsapp_share_url(&self.links.registration_share_text())
    }
}

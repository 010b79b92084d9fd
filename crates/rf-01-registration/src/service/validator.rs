//! Referral code validator
//!
//! Resolves raw user input to a referrer through the store's
//! `validate_referral_code` procedure. Read-only.

use shared_types::ReferralCode;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::ReferralLookup;
use crate::error::ReferralLookupUnavailable;
use crate::ports::ProfileStore;

pub struct ReferralCodeValidator<S: ProfileStore> {
    store: Arc<S>,
}

impl<S: ProfileStore> ReferralCodeValidator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Normalize `raw` and look it up.
    ///
    /// Blank input is `Empty`, not an error. A failing lookup is logged at
    /// `warn` and returned as `ReferralLookupUnavailable`.
    pub async fn validate(&self, raw: &str) -> Result<ReferralLookup, ReferralLookupUnavailable> {
        let Some(code) = ReferralCode::normalize(raw) else {
            return Ok(ReferralLookup::Empty);
        };

        match self.store.validate_referral_code(&code).await {
            Ok(Some(referrer_id)) => {
                debug!(code = %code, referrer = %referrer_id, "Referral code resolved");
                Ok(ReferralLookup::Found(referrer_id))
            }
            Ok(None) => {
                debug!(code = %code, "Referral code not found");
                Ok(ReferralLookup::NotFound)
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Referral code lookup failed");
                Err(ReferralLookupUnavailable(e.to_string()))
            }
        }
    }
}

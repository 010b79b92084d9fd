//! Registration Service
//!
//! Orchestrates one registration:
//!
//! ```text
//! validate code ──▶ sign_up ──▶ ensure profile ──▶ apply referral ──▶ outcome
//!  (fail soft)     (fail fast)   (fail fast)        (fail soft)
//! ```
//!
//! Profile provisioning polls for the row the store trigger creates, then
//! falls back to the `create_profile` procedure, then to a direct insert with
//! a placeholder code. Every fallback re-fetches first so a row that already
//! exists is never duplicated or overwritten.

use async_trait::async_trait;
use shared_types::{NewProfile, Profile, SessionState, StoreError, UserId};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::domain::{
    ReferralLookup, ReferralStatus, RegistrationConfig, RegistrationForm, RegistrationOutcome,
    ValidatedRegistration,
};
use crate::error::{ProvisioningStep, ReferralLookupUnavailable, RegistrationError};
use crate::ports::{
    IdentityProvider, ProfileStore, RegistrationApi, SignUpMetadata, SignUpRequest,
};
use crate::service::validator::ReferralCodeValidator;
use shared_types::IdentityError;

/// Registration Service implementation
///
/// Implements the `RegistrationApi` port using injected platform ports.
pub struct RegistrationService<I: IdentityProvider, S: ProfileStore> {
    identity: Arc<I>,
    store: Arc<S>,
    validator: ReferralCodeValidator<S>,
    config: RegistrationConfig,
}

impl<I: IdentityProvider, S: ProfileStore> RegistrationService<I, S> {
    pub fn new(identity: Arc<I>, store: Arc<S>) -> Self {
        Self::with_config(identity, store, RegistrationConfig::default())
    }

    pub fn with_config(identity: Arc<I>, store: Arc<S>, config: RegistrationConfig) -> Self {
        Self {
            identity,
            validator: ReferralCodeValidator::new(store.clone()),
            store,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// Step 1: resolve the submitted code. Never fails the registration.
    async fn resolve_referrer(&self, raw: Option<&str>) -> (Option<UserId>, ReferralStatus) {
        match self.validator.validate(raw.unwrap_or_default()).await {
            Ok(ReferralLookup::Empty) => (None, ReferralStatus::NotRequested),
            Ok(ReferralLookup::Found(id)) => (Some(id), ReferralStatus::NotRequested),
            Ok(ReferralLookup::NotFound) => (None, ReferralStatus::InvalidCode),
            Err(_) => (None, ReferralStatus::LookupUnavailable),
        }
    }

    /// Step 2: create the identity.
    async fn create_identity(
        &self,
        input: &ValidatedRegistration,
    ) -> Result<(UserId, SessionState), RegistrationError> {
        let request = SignUpRequest {
            email: input.email.clone(),
            password: input.password.clone(),
            metadata: SignUpMetadata {
                name: input.name.clone(),
                phone: input.phone.clone(),
            },
        };

        let result = self.identity.sign_up(&request).await.map_err(|e| {
            warn!(error = %e, "Sign-up rejected");
            match e {
                IdentityError::RateLimited => RegistrationError::RateLimited,
                e if e.is_user_input() => RegistrationError::UserInput(e.to_string()),
                e => RegistrationError::IdentityCreation(e.to_string()),
            }
        })?;

        let Some(user_id) = result.user_id else {
            error!("Sign-up succeeded without a user id");
            return Err(RegistrationError::MissingUserId);
        };

        let session = match result.session {
            Some(session) => SessionState::SignedIn(session),
            None => SessionState::PendingConfirmation {
                user_id,
                email: input.email.clone(),
            },
        };
        Ok((user_id, session))
    }

    /// Step 3: make sure a profile row exists for `id`.
    async fn ensure_profile(
        &self,
        id: &UserId,
        input: &ValidatedRegistration,
    ) -> Result<Profile, RegistrationError> {
        let mut last_failure = (
            ProvisioningStep::AwaitTrigger,
            "profile row did not appear".to_string(),
        );

        for (attempt, delay) in self.config.profile_poll_delays.iter().enumerate() {
            if !delay.is_zero() {
                tokio::time::sleep(*delay).await;
            }
            match self.store.fetch_profile(id).await {
                Ok(Some(profile)) => {
                    debug!(attempt, "Profile created by trigger");
                    return Ok(profile);
                }
                Ok(None) => debug!(attempt, "Profile not there yet"),
                Err(e) => {
                    warn!(attempt, error = %e, "Profile fetch failed while polling");
                    last_failure.1 = e.to_string();
                }
            }
        }

        info!(user = %id, "Profile missing after polling, calling create_profile");
        match self
            .store
            .create_profile(id, Some(&input.name), Some(&input.phone))
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_conflict() => debug!("create_profile reports existing row"),
            Err(e) => {
                warn!(error = %e, "create_profile failed");
                last_failure = (ProvisioningStep::CreateProcedure, e.to_string());
            }
        }
        match self.refetch(id).await {
            Ok(Some(profile)) => return Ok(profile),
            Ok(None) if last_failure.0 == ProvisioningStep::AwaitTrigger => {
                last_failure = (
                    ProvisioningStep::CreateProcedure,
                    "profile still missing after create_profile".to_string(),
                );
            }
            Ok(None) => {}
            Err(e) => last_failure = (ProvisioningStep::CreateProcedure, e.to_string()),
        }

        info!(user = %id, "Falling back to direct insert with placeholder code");
        let row = NewProfile::with_placeholder_code(
            *id,
            Some(input.name.clone()),
            Some(input.phone.clone()),
        );
        let insert_failure = match self.store.insert_profile(&row).await {
            Ok(()) => None,
            Err(e) if e.is_conflict() => {
                debug!("Direct insert hit an existing row");
                None
            }
            Err(e) => {
                warn!(error = %e, "Direct insert failed");
                Some(e.to_string())
            }
        };
        match self.refetch(id).await {
            Ok(Some(profile)) => return Ok(profile),
            Ok(None) => {
                last_failure = (
                    ProvisioningStep::DirectInsert,
                    insert_failure
                        .unwrap_or_else(|| "profile still missing after insert".to_string()),
                );
            }
            Err(e) => {
                last_failure = (
                    ProvisioningStep::DirectInsert,
                    insert_failure.unwrap_or_else(|| e.to_string()),
                );
            }
        }

        error!(
            user = %id,
            failed_step = %last_failure.0,
            detail = %last_failure.1,
            "Profile provisioning failed"
        );
        Err(RegistrationError::ProfileProvisioning {
            failed_step: last_failure.0,
            detail: last_failure.1,
        })
    }

    async fn refetch(&self, id: &UserId) -> Result<Option<Profile>, StoreError> {
        self.store.fetch_profile(id).await.inspect_err(|e| {
            warn!(error = %e, "Profile re-fetch failed");
        })
    }

    /// Step 4: link the referral if it applies. Never fails the registration.
    async fn apply_referral(
        &self,
        profile: Profile,
        referrer_id: UserId,
    ) -> (Profile, ReferralStatus) {
        if referrer_id == profile.id {
            debug!(user = %profile.id, "Self-referral skipped");
            return (profile, ReferralStatus::SelfReferral);
        }
        if let Some(existing) = profile.referred_by {
            info!(user = %profile.id, referrer = %existing, "Profile already referred, not overwriting");
            return (
                profile,
                ReferralStatus::AlreadyReferred {
                    referrer_id: existing,
                },
            );
        }

        if let Err(e) = self.store.apply_referral(&profile.id, &referrer_id).await {
            warn!(user = %profile.id, referrer = %referrer_id, error = %e, "Referral not counted");
            return (profile, ReferralStatus::NotCounted { referrer_id });
        }

        match self.store.fetch_profile(&profile.id).await {
            Ok(Some(updated)) => match updated.referred_by {
                // Linked by another attempt between our read and the apply.
                Some(other) if other != referrer_id => {
                    info!(
                        user = %updated.id,
                        submitted = %referrer_id,
                        referrer = %other,
                        "Profile was referred concurrently, not counted"
                    );
                    (updated, ReferralStatus::AlreadyReferred { referrer_id: other })
                }
                Some(_) => (updated, ReferralStatus::Applied { referrer_id }),
                None => {
                    warn!(
                        user = %updated.id,
                        expected = %referrer_id,
                        "Referral applied but referred_by is still empty"
                    );
                    (updated, ReferralStatus::Applied { referrer_id })
                }
            },
            Ok(None) | Err(_) => {
                debug!(user = %profile.id, "Could not re-read profile after referral");
                (profile, ReferralStatus::Applied { referrer_id })
            }
        }
    }
}

#[async_trait]
impl<I, S> RegistrationApi for RegistrationService<I, S>
where
    I: IdentityProvider + 'static,
    S: ProfileStore + 'static,
{
    async fn register(
        &self,
        state: &SessionState,
        form: RegistrationForm,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        if state.is_signed_in() {
            return Err(RegistrationError::AlreadySignedIn);
        }
        let input = form.validate(self.config.min_password_len)?;

        let span = info_span!("register", email = %input.email);
        async move {
            let (referrer, initial_status) =
                self.resolve_referrer(input.referral_code.as_deref()).await;

            let (user_id, session) = self.create_identity(&input).await?;
            info!(user = %user_id, pending = !session.is_signed_in(), "Identity created");

            let profile = self.ensure_profile(&user_id, &input).await?;

            let (profile, referral) = match referrer {
                Some(referrer_id) => self.apply_referral(profile, referrer_id).await,
                None => (profile, initial_status),
            };

            info!(user = %user_id, referral = ?referral, "Registration complete");
            Ok(RegistrationOutcome {
                profile,
                session,
                referral,
            })
        }
        .instrument(span)
        .await
    }

    async fn validate_referral_code(
        &self,
        raw: &str,
    ) -> Result<ReferralLookup, ReferralLookupUnavailable> {
        self.validator.validate(raw).await
    }
}

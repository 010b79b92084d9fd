//! # In-Memory Platform
//!
//! Identity provider and profile store in one process, behind one lock.
//! Implements every platform port:
//!
//! - `IdentityProvider`, `ProfileStore` (registration)
//! - `QrCodeStore` (QR provisioning)
//! - `ProfileDirectory` (dashboards)
//!
//! The profile trigger can be immediate, delayed or disabled, which lets the
//! registration fallbacks run against a real adapter. Every row change is
//! published on the shared bus after the lock is released.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rf_01_registration::{IdentityProvider, ProfileStore, SignUpRequest, SignUpResult};
use rf_02_qr_provisioning::QrCodeStore;
use rf_03_community_card::ProfileDirectory;
use shared_bus::{EventPublisher, InMemoryEventBus, ProfileEvent};
use shared_types::{
    IdentityError, NewProfile, Profile, ReferralCode, Session, StoreError, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Length of generated referral codes.
pub const GENERATED_CODE_LEN: usize = 8;

/// Lowest password length the in-memory provider accepts.
const MIN_PASSWORD_LEN: usize = 6;

/// When the profile row appears after a sign-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProfileTrigger {
    /// Before `sign_up` returns.
    #[default]
    Immediate,
    /// Once this much time has passed since `sign_up`.
    Delayed(Duration),
    /// Never; a fallback has to create the row.
    Disabled,
}

/// In-memory platform behavior.
#[derive(Debug, Clone, Default)]
pub struct MemoryPlatformConfig {
    pub trigger: ProfileTrigger,
    /// Withhold sessions until `confirm_email` is called.
    pub require_email_confirmation: bool,
    /// Session lifetime. `None` never expires.
    pub session_ttl: Option<chrono::Duration>,
}

struct Account {
    id: UserId,
    password: String,
    confirmed: bool,
}

#[derive(Default)]
struct PlatformState {
    /// Keyed by lower-cased email.
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, Session>,
    profiles: HashMap<UserId, Profile>,
    /// Trigger rows not visible yet.
    pending: HashMap<UserId, (Instant, Profile)>,
}

impl PlatformState {
    fn code_taken(&self, code: &ReferralCode, except: Option<&UserId>) -> bool {
        self.profiles
            .values()
            .any(|p| Some(&p.id) != except && p.referral_code.matches(code))
    }

    fn generate_code(&self) -> ReferralCode {
        let mut rng = rand::thread_rng();
        loop {
            let raw: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(GENERATED_CODE_LEN)
                .map(|b| char::from(b).to_ascii_lowercase())
                .collect();
            let code = ReferralCode::from_stored(raw);
            let pending_clash = self
                .pending
                .values()
                .any(|(_, p)| p.referral_code.matches(&code));
            if !pending_clash && !self.code_taken(&code, None) {
                return code;
            }
        }
    }

    fn new_row(&self, id: UserId, name: Option<&str>, phone: Option<&str>) -> Profile {
        Profile {
            id,
            name: name.map(str::to_owned),
            phone: phone.map(str::to_owned),
            referral_code: self.generate_code(),
            referred_by: None,
            referral_count: 0,
            qr_code_url: None,
            created_at: Utc::now(),
        }
    }

    /// Move due trigger rows into the table. Returns the created rows' events.
    fn materialize(&mut self, now: Instant) -> Vec<ProfileEvent> {
        let due: Vec<UserId> = self
            .pending
            .iter()
            .filter(|(_, (at, _))| *at <= now)
            .map(|(id, _)| *id)
            .collect();

        let mut events = Vec::new();
        for id in due {
            let Some((_, row)) = self.pending.remove(&id) else {
                continue;
            };
            if self.profiles.contains_key(&id) {
                continue;
            }
            events.push(ProfileEvent::ProfileCreated {
                profile_id: id,
                referral_code: row.referral_code.clone(),
            });
            self.profiles.insert(id, row);
        }
        events
    }
}

/// In-process identity provider and profile store.
pub struct InMemoryPlatform {
    state: Mutex<PlatformState>,
    config: MemoryPlatformConfig,
    events: Arc<InMemoryEventBus>,
}

impl InMemoryPlatform {
    pub fn new(config: MemoryPlatformConfig, events: Arc<InMemoryEventBus>) -> Self {
        Self {
            state: Mutex::new(PlatformState::default()),
            config,
            events,
        }
    }

    /// The bus row changes are published on.
    pub fn events(&self) -> &Arc<InMemoryEventBus> {
        &self.events
    }

    /// Run `f` under the lock after materializing due trigger rows, then
    /// publish the trigger events and whatever `f` returns.
    async fn with_state<T>(
        &self,
        f: impl FnOnce(&mut PlatformState) -> (T, Vec<ProfileEvent>),
    ) -> T {
        let (value, events) = {
            let mut state = self.state.lock();
            let mut events = state.materialize(Instant::now());
            let (value, more) = f(&mut state);
            events.extend(more);
            (value, events)
        };
        for event in events {
            self.events.publish(event).await;
        }
        value
    }

    fn read_profile_now(&self, id: &UserId) -> Option<Profile> {
        self.state.lock().profiles.get(id).cloned()
    }

    /// Mark an account's email as confirmed.
    pub fn confirm_email(&self, email: &str) -> bool {
        let mut state = self.state.lock();
        match state.accounts.get_mut(&email.trim().to_lowercase()) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Insert a ready profile with a fixed code, bypassing sign-up.
    pub async fn seed_profile(&self, name: &str, code: &str) -> Result<Profile, StoreError> {
        let code = ReferralCode::from_stored(code);
        self.with_state(|state| {
            if state.code_taken(&code, None) {
                return (Err(StoreError::CodeTaken(code.to_string())), Vec::new());
            }
            let mut profile = state.new_row(UserId::new_v4(), Some(name), None);
            profile.referral_code = code;
            state.profiles.insert(profile.id, profile.clone());
            let event = ProfileEvent::ProfileCreated {
                profile_id: profile.id,
                referral_code: profile.referral_code.clone(),
            };
            (Ok(profile), vec![event])
        })
        .await
    }

    /// Number of profile rows currently visible.
    pub fn profile_count(&self) -> usize {
        self.state.lock().profiles.len()
    }

    fn issue_session(&self, state: &mut PlatformState, id: UserId, email: &str) -> Session {
        let session = Session {
            access_token: Uuid::new_v4().simple().to_string(),
            user_id: id,
            email: email.to_string(),
            expires_at: self.config.session_ttl.map(|ttl| Utc::now() + ttl),
        };
        state
            .sessions
            .insert(session.access_token.clone(), session.clone());
        session
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

#[async_trait]
impl IdentityProvider for InMemoryPlatform {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResult, IdentityError> {
        let email = request.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(IdentityError::InvalidInput(
                "Unable to validate email address: invalid format".into(),
            ));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::InvalidInput(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let trigger = self.config.trigger;
        let confirm = self.config.require_email_confirmation;
        let name = request.metadata.name.clone();
        let phone = request.metadata.phone.clone();

        self.with_state(|state| {
            if state.accounts.contains_key(&email) {
                return (Err(IdentityError::AlreadyRegistered), Vec::new());
            }

            let id = UserId::new_v4();
            state.accounts.insert(
                email.clone(),
                Account {
                    id,
                    password: request.password.clone(),
                    confirmed: !confirm,
                },
            );

            let mut events = Vec::new();
            match trigger {
                ProfileTrigger::Immediate => {
                    let row = state.new_row(id, Some(&name), Some(&phone));
                    events.push(ProfileEvent::ProfileCreated {
                        profile_id: id,
                        referral_code: row.referral_code.clone(),
                    });
                    state.profiles.insert(id, row);
                }
                ProfileTrigger::Delayed(delay) => {
                    let row = state.new_row(id, Some(&name), Some(&phone));
                    state.pending.insert(id, (Instant::now() + delay, row));
                }
                ProfileTrigger::Disabled => {}
            }

            let session = (!confirm).then(|| self.issue_session(state, id, &email));
            info!(user = %id, confirmation_required = confirm, "Identity created");
            (
                Ok(SignUpResult {
                    user_id: Some(id),
                    session,
                }),
                events,
            )
        })
        .await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, IdentityError> {
        let email = email.trim().to_lowercase();
        let mut state = self.state.lock();
        let (id, confirmed) = match state.accounts.get(&email) {
            Some(account) if account.password == password => (account.id, account.confirmed),
            _ => return Err(IdentityError::InvalidCredentials),
        };
        if !confirmed {
            return Err(IdentityError::EmailNotConfirmed);
        }
        Ok(Some(self.issue_session(&mut state, id, &email)))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError> {
        self.state.lock().sessions.remove(&session.access_token);
        Ok(())
    }

    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, IdentityError> {
        Ok(self.state.lock().sessions.get(access_token).cloned())
    }
}

// =============================================================================
// PROFILE STORE
// =============================================================================

#[async_trait]
impl ProfileStore for InMemoryPlatform {
    async fn fetch_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .with_state(|state| (state.profiles.get(id).cloned(), Vec::new()))
            .await)
    }

    async fn validate_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<UserId>, StoreError> {
        Ok(self
            .with_state(|state| {
                let owner = state
                    .profiles
                    .values()
                    .find(|p| p.referral_code.matches(code))
                    .map(|p| p.id);
                (owner, Vec::new())
            })
            .await)
    }

    async fn create_profile(
        &self,
        id: &UserId,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), StoreError> {
        self.with_state(|state| {
            if state.profiles.contains_key(id) {
                return ((), Vec::new());
            }
            // The procedure supersedes a trigger row that has not landed yet.
            state.pending.remove(id);
            let row = state.new_row(*id, name, phone);
            let event = ProfileEvent::ProfileCreated {
                profile_id: *id,
                referral_code: row.referral_code.clone(),
            };
            state.profiles.insert(*id, row);
            debug!(user = %id, "Profile created by procedure");
            ((), vec![event])
        })
        .await;
        Ok(())
    }

    async fn insert_profile(&self, row: &NewProfile) -> Result<(), StoreError> {
        self.with_state(|state| {
            if state.profiles.contains_key(&row.id) {
                return (Err(StoreError::AlreadyExists(row.id.to_string())), Vec::new());
            }
            if state.code_taken(&row.referral_code, Some(&row.id)) {
                return (
                    Err(StoreError::CodeTaken(row.referral_code.to_string())),
                    Vec::new(),
                );
            }
            state.pending.remove(&row.id);
            let profile = Profile {
                id: row.id,
                name: row.name.clone(),
                phone: row.phone.clone(),
                referral_code: row.referral_code.clone(),
                referred_by: None,
                referral_count: 0,
                qr_code_url: None,
                created_at: Utc::now(),
            };
            state.profiles.insert(row.id, profile);
            let event = ProfileEvent::ProfileCreated {
                profile_id: row.id,
                referral_code: row.referral_code.clone(),
            };
            (Ok(()), vec![event])
        })
        .await
    }

    async fn apply_referral(
        &self,
        new_id: &UserId,
        referrer_id: &UserId,
    ) -> Result<(), StoreError> {
        self.with_state(|state| {
            if new_id == referrer_id {
                return (Err(StoreError::Rejected("self-referral".into())), Vec::new());
            }
            if !state.profiles.contains_key(referrer_id) {
                return (Err(StoreError::NotFound(referrer_id.to_string())), Vec::new());
            }
            let Some(profile) = state.profiles.get_mut(new_id) else {
                return (Err(StoreError::NotFound(new_id.to_string())), Vec::new());
            };
            if profile.referred_by.is_some() {
                return (Ok(()), Vec::new());
            }
            profile.referred_by = Some(*referrer_id);
            if let Some(referrer) = state.profiles.get_mut(referrer_id) {
                referrer.referral_count += 1;
            }
            let event = ProfileEvent::ReferralApplied {
                referrer_id: *referrer_id,
                referred_id: *new_id,
            };
            (Ok(()), vec![event])
        })
        .await
    }
}

// =============================================================================
// QR STORE
// =============================================================================

#[async_trait]
impl QrCodeStore for InMemoryPlatform {
    async fn save_qr_code_url(&self, id: &UserId, url: &str) -> Result<(), StoreError> {
        self.with_state(|state| match state.profiles.get_mut(id) {
            Some(profile) => {
                profile.qr_code_url = Some(url.to_string());
                (Ok(()), vec![ProfileEvent::ProfileUpdated { profile_id: *id }])
            }
            None => (Err(StoreError::NotFound(id.to_string())), Vec::new()),
        })
        .await
    }
}

// =============================================================================
// DIRECTORY
// =============================================================================

#[async_trait]
impl ProfileDirectory for InMemoryPlatform {
    async fn fetch_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError> {
        ProfileStore::fetch_profile(self, id).await
    }

    async fn list_referrals(&self, referrer: &UserId) -> Result<Vec<Profile>, StoreError> {
        Ok(self
            .with_state(|state| {
                let referrals = state
                    .profiles
                    .values()
                    .filter(|p| p.referred_by.as_ref() == Some(referrer))
                    .cloned()
                    .collect();
                (referrals, Vec::new())
            })
            .await)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        Ok(self
            .with_state(|state| (state.profiles.values().cloned().collect(), Vec::new()))
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_01_registration::SignUpMetadata;
    use shared_bus::EventFilter;

    fn platform(config: MemoryPlatformConfig) -> InMemoryPlatform {
        InMemoryPlatform::new(config, Arc::new(InMemoryEventBus::new()))
    }

    fn request(email: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.into(),
            password: "secret1".into(),
            metadata: SignUpMetadata {
                name: "Ada".into(),
                phone: "555".into(),
            },
        }
    }

    #[tokio::test]
    async fn test_immediate_trigger_creates_profile() {
        let p = platform(MemoryPlatformConfig::default());
        let result = p.sign_up(&request("ada@example.com")).await.unwrap();
        let id = result.user_id.unwrap();

        let profile = ProfileStore::fetch_profile(&p, &id).await.unwrap().unwrap();
        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert_eq!(profile.referral_code.as_str().len(), GENERATED_CODE_LEN);
        assert!(profile
            .referral_code
            .as_str()
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert!(result.session.is_some());
    }

    #[tokio::test]
    async fn test_delayed_trigger_appears_later() {
        let p = platform(MemoryPlatformConfig {
            trigger: ProfileTrigger::Delayed(Duration::from_millis(30)),
            ..Default::default()
        });
        let id = p
            .sign_up(&request("ada@example.com"))
            .await
            .unwrap()
            .user_id
            .unwrap();

        assert!(ProfileStore::fetch_profile(&p, &id).await.unwrap().is_none());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ProfileStore::fetch_profile(&p, &id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_disabled_trigger_needs_procedure() {
        let p = platform(MemoryPlatformConfig {
            trigger: ProfileTrigger::Disabled,
            ..Default::default()
        });
        let id = p
            .sign_up(&request("ada@example.com"))
            .await
            .unwrap()
            .user_id
            .unwrap();
        assert!(ProfileStore::fetch_profile(&p, &id).await.unwrap().is_none());

        p.create_profile(&id, Some("Ada"), None).await.unwrap();
        p.create_profile(&id, Some("Other"), None).await.unwrap();

        let profile = ProfileStore::fetch_profile(&p, &id).await.unwrap().unwrap();
        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert_eq!(p.profile_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let p = platform(MemoryPlatformConfig::default());
        p.sign_up(&request("ada@example.com")).await.unwrap();
        let err = p.sign_up(&request(" ADA@example.com ")).await.unwrap_err();
        assert_eq!(err, IdentityError::AlreadyRegistered);
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let p = platform(MemoryPlatformConfig::default());
        let mut req = request("ada@example.com");
        req.password = "12345".into();
        let err = p.sign_up(&req).await.unwrap_err();
        assert!(err.is_user_input());
    }

    #[tokio::test]
    async fn test_email_confirmation_flow() {
        let p = platform(MemoryPlatformConfig {
            require_email_confirmation: true,
            ..Default::default()
        });
        let result = p.sign_up(&request("ada@example.com")).await.unwrap();
        assert!(result.session.is_none());

        let err = p.sign_in("ada@example.com", "secret1").await.unwrap_err();
        assert_eq!(err, IdentityError::EmailNotConfirmed);

        assert!(p.confirm_email("ada@example.com"));
        let session = p.sign_in("ada@example.com", "secret1").await.unwrap().unwrap();
        assert_eq!(
            p.get_session(&session.access_token).await.unwrap(),
            Some(session.clone())
        );

        p.sign_out(&session).await.unwrap();
        assert!(p.get_session(&session.access_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let p = platform(MemoryPlatformConfig::default());
        p.sign_up(&request("ada@example.com")).await.unwrap();
        assert_eq!(
            p.sign_in("ada@example.com", "nope").await.unwrap_err(),
            IdentityError::InvalidCredentials
        );
        assert_eq!(
            p.sign_in("bob@example.com", "secret1").await.unwrap_err(),
            IdentityError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn test_code_lookup_is_case_insensitive() {
        let p = platform(MemoryPlatformConfig::default());
        let seeded = p.seed_profile("Ref", "ab12cd34").await.unwrap();

        let found = p
            .validate_referral_code(&ReferralCode::from_stored("AB12CD34"))
            .await
            .unwrap();
        assert_eq!(found, Some(seeded.id));
    }

    #[tokio::test]
    async fn test_insert_conflicts() {
        let p = platform(MemoryPlatformConfig::default());
        let seeded = p.seed_profile("Ref", "ab12cd34").await.unwrap();

        let dup_id = NewProfile {
            id: seeded.id,
            name: None,
            phone: None,
            referral_code: ReferralCode::placeholder_for(&seeded.id),
        };
        assert!(p.insert_profile(&dup_id).await.unwrap_err().is_conflict());

        let dup_code = NewProfile {
            id: UserId::new_v4(),
            name: None,
            phone: None,
            referral_code: ReferralCode::from_stored("AB12CD34"),
        };
        assert!(matches!(
            p.insert_profile(&dup_code).await,
            Err(StoreError::CodeTaken(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_referral_once() {
        let p = platform(MemoryPlatformConfig::default());
        let referrer = p.seed_profile("Ref", "ab12cd34").await.unwrap();
        let other = p.seed_profile("Other", "zz99zz99").await.unwrap();
        let new = p.seed_profile("New", "nn11nn11").await.unwrap();

        p.apply_referral(&new.id, &referrer.id).await.unwrap();
        p.apply_referral(&new.id, &other.id).await.unwrap();

        let new = ProfileStore::fetch_profile(&p, &new.id).await.unwrap().unwrap();
        assert_eq!(new.referred_by, Some(referrer.id));
        assert_eq!(p.read_profile_now(&referrer.id).unwrap().referral_count, 1);
        assert_eq!(p.read_profile_now(&other.id).unwrap().referral_count, 0);

        assert!(matches!(
            p.apply_referral(&referrer.id, &referrer.id).await,
            Err(StoreError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_referrals_all_counted() {
        let p = Arc::new(platform(MemoryPlatformConfig::default()));
        let referrer = p.seed_profile("Ref", "ab12cd34").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let p = p.clone();
            let referrer_id = referrer.id;
            handles.push(tokio::spawn(async move {
                let new = p
                    .seed_profile("New", &format!("new{i:05}"))
                    .await
                    .unwrap();
                p.apply_referral(&new.id, &referrer_id).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(p.read_profile_now(&referrer.id).unwrap().referral_count, 20);
        assert_eq!(p.list_referrals(&referrer.id).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_changes_are_published() {
        let p = platform(MemoryPlatformConfig::default());
        let referrer = p.seed_profile("Ref", "ab12cd34").await.unwrap();
        let mut sub = p.events().subscribe(EventFilter::for_user(referrer.id));

        let new = p.seed_profile("New", "nn11nn11").await.unwrap();
        p.apply_referral(&new.id, &referrer.id).await.unwrap();
        p.save_qr_code_url(&referrer.id, "data:qr").await.unwrap();

        assert_eq!(
            sub.try_recv().unwrap(),
            Some(ProfileEvent::ReferralApplied {
                referrer_id: referrer.id,
                referred_id: new.id,
            })
        );
        assert_eq!(
            sub.try_recv().unwrap(),
            Some(ProfileEvent::ProfileUpdated {
                profile_id: referrer.id
            })
        );
    }
}

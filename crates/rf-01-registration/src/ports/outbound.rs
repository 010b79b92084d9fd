//! Outbound Ports (Driven Ports)
//!
//! Dependencies the registration workflow needs from the platform: the
//! identity provider and the profile store's atomic procedures.

use async_trait::async_trait;
use shared_types::{IdentityError, NewProfile, Profile, ReferralCode, Session, StoreError, UserId};

/// Metadata attached to a new identity and copied into the profile row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignUpMetadata {
    pub name: String,
    pub phone: String,
}

/// Identity creation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub metadata: SignUpMetadata,
}

/// What the provider returned for a sign-up.
///
/// `session` is `None` when email confirmation is required.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignUpResult {
    pub user_id: Option<UserId>,
    pub session: Option<Session>,
}

/// Identity provider (Driven Port)
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an identity.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResult, IdentityError>;

    /// Exchange credentials for a session. `Ok(None)` means no session was issued.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, IdentityError>;

    /// Revoke a session.
    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError>;

    /// Resolve a bearer token to its session.
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, IdentityError>;
}

/// Profile store (Driven Port)
///
/// `validate_referral_code`, `create_profile` and `apply_referral` are
/// single-transaction procedures on the store side.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a profile by id.
    async fn fetch_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError>;

    /// Resolve a referral code to its owner. Case-insensitive.
    async fn validate_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<UserId>, StoreError>;

    /// Create the profile row with a generated code if it does not exist yet.
    async fn create_profile(
        &self,
        id: &UserId,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Insert a row directly. Fails with `AlreadyExists` if the id is taken.
    async fn insert_profile(&self, row: &NewProfile) -> Result<(), StoreError>;

    /// Link `new_id` to `referrer_id` and increment the referrer's count,
    /// atomically. A profile that already has a referrer is left unchanged.
    async fn apply_referral(&self, new_id: &UserId, referrer_id: &UserId)
        -> Result<(), StoreError>;
}

// =============================================================================
// TEST MOCKS
// =============================================================================

/// When the mock store's "trigger" creates a profile row after sign-up.
#[cfg(test)]
#[derive(Clone, Copy, Debug)]
pub enum TriggerMode {
    /// Row exists before sign-up returns.
    Immediate,
    /// Row appears once this many fetches have been made for it.
    AfterFetches(usize),
    /// No trigger; the row must be created by a fallback.
    Never,
}

#[cfg(test)]
#[derive(Default)]
struct MockStoreState {
    profiles: std::collections::HashMap<UserId, Profile>,
    /// Rows the trigger will create, with fetches remaining.
    pending: std::collections::HashMap<UserId, (usize, Profile)>,
    next_code: u32,
}

/// In-memory profile store with failure switches.
#[cfg(test)]
pub struct MockProfileStore {
    state: parking_lot::Mutex<MockStoreState>,
    pub trigger: parking_lot::Mutex<TriggerMode>,
    pub fail_fetch: std::sync::atomic::AtomicBool,
    pub fail_validate: std::sync::atomic::AtomicBool,
    pub fail_create: std::sync::atomic::AtomicBool,
    pub create_is_noop: std::sync::atomic::AtomicBool,
    pub fail_insert: std::sync::atomic::AtomicBool,
    pub fail_apply: std::sync::atomic::AtomicBool,
    /// Another registration links the profile to this referrer just before
    /// the next `apply_referral` runs.
    pub link_before_apply: parking_lot::Mutex<Option<UserId>>,
    pub create_calls: std::sync::atomic::AtomicUsize,
    pub insert_calls: std::sync::atomic::AtomicUsize,
    pub apply_calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockProfileStore {
    pub fn new(trigger: TriggerMode) -> Self {
        Self {
            state: parking_lot::Mutex::new(MockStoreState::default()),
            trigger: parking_lot::Mutex::new(trigger),
            fail_fetch: Default::default(),
            fail_validate: Default::default(),
            fail_create: Default::default(),
            create_is_noop: Default::default(),
            fail_insert: Default::default(),
            fail_apply: Default::default(),
            link_before_apply: Default::default(),
            create_calls: Default::default(),
            insert_calls: Default::default(),
            apply_calls: Default::default(),
        }
    }

    pub fn set(flag: &std::sync::atomic::AtomicBool) {
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn count(counter: &std::sync::atomic::AtomicUsize) -> usize {
        counter.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn flag(flag: &std::sync::atomic::AtomicBool) -> bool {
        flag.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn new_row(state: &mut MockStoreState, id: UserId, name: Option<&str>, phone: Option<&str>) -> Profile {
        state.next_code += 1;
        Profile {
            id,
            name: name.map(str::to_owned),
            phone: phone.map(str::to_owned),
            referral_code: ReferralCode::from_stored(format!("code{:04}", state.next_code)),
            referred_by: None,
            referral_count: 0,
            qr_code_url: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Seed an existing profile with a fixed code.
    pub fn seed(&self, code: &str) -> Profile {
        let mut state = self.state.lock();
        let mut profile = Self::new_row(&mut state, UserId::new_v4(), Some("Seed"), None);
        profile.referral_code = ReferralCode::from_stored(code);
        state.profiles.insert(profile.id, profile.clone());
        profile
    }

    /// Called by the mock identity provider after it creates a user.
    pub fn on_user_created(&self, id: UserId, name: &str, phone: &str) {
        let trigger = *self.trigger.lock();
        let mut state = self.state.lock();
        if state.profiles.contains_key(&id) {
            return;
        }
        match trigger {
            TriggerMode::Immediate => {
                let row = Self::new_row(&mut state, id, Some(name), Some(phone));
                state.profiles.insert(id, row);
            }
            TriggerMode::AfterFetches(n) => {
                let row = Self::new_row(&mut state, id, Some(name), Some(phone));
                state.pending.insert(id, (n, row));
            }
            TriggerMode::Never => {}
        }
    }

    pub fn profile(&self, id: &UserId) -> Option<Profile> {
        self.state.lock().profiles.get(id).cloned()
    }

    pub fn profile_count(&self) -> usize {
        self.state.lock().profiles.len()
    }
}

#[cfg(test)]
#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn fetch_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError> {
        if Self::flag(&self.fail_fetch) {
            return Err(StoreError::Unavailable("fetch disabled".into()));
        }
        let mut state = self.state.lock();
        if let Some((remaining, _)) = state.pending.get_mut(id) {
            if *remaining <= 1 {
                if let Some((_, row)) = state.pending.remove(id) {
                    state.profiles.entry(*id).or_insert(row);
                }
            } else {
                *remaining -= 1;
            }
        }
        Ok(state.profiles.get(id).cloned())
    }

    async fn validate_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<UserId>, StoreError> {
        if Self::flag(&self.fail_validate) {
            return Err(StoreError::Unavailable("rpc disabled".into()));
        }
        let state = self.state.lock();
        Ok(state
            .profiles
            .values()
            .find(|p| p.referral_code.matches(code))
            .map(|p| p.id))
    }

    async fn create_profile(
        &self,
        id: &UserId,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), StoreError> {
        self.create_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if Self::flag(&self.fail_create) {
            return Err(StoreError::Unavailable("create_profile disabled".into()));
        }
        if Self::flag(&self.create_is_noop) {
            return Ok(());
        }
        let mut state = self.state.lock();
        if !state.profiles.contains_key(id) {
            let row = Self::new_row(&mut state, *id, name, phone);
            state.profiles.insert(*id, row);
        }
        Ok(())
    }

    async fn insert_profile(&self, row: &NewProfile) -> Result<(), StoreError> {
        self.insert_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if Self::flag(&self.fail_insert) {
            return Err(StoreError::Rejected("insert disabled".into()));
        }
        let mut state = self.state.lock();
        if state.profiles.contains_key(&row.id) {
            return Err(StoreError::AlreadyExists(row.id.to_string()));
        }
        let mut profile = Self::new_row(&mut state, row.id, row.name.as_deref(), row.phone.as_deref());
        profile.referral_code = row.referral_code.clone();
        state.profiles.insert(row.id, profile);
        Ok(())
    }

    async fn apply_referral(
        &self,
        new_id: &UserId,
        referrer_id: &UserId,
    ) -> Result<(), StoreError> {
        self.apply_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if Self::flag(&self.fail_apply) {
            return Err(StoreError::Unavailable("apply_referral disabled".into()));
        }
        if new_id == referrer_id {
            return Err(StoreError::Rejected("self-referral".into()));
        }
        let mut state = self.state.lock();
        if let Some(earlier) = self.link_before_apply.lock().take() {
            if let Some(profile) = state.profiles.get_mut(new_id) {
                profile.referred_by = Some(earlier);
            }
            if let Some(referrer) = state.profiles.get_mut(&earlier) {
                referrer.referral_count += 1;
            }
        }
        if !state.profiles.contains_key(referrer_id) {
            return Err(StoreError::NotFound(referrer_id.to_string()));
        }
        let Some(profile) = state.profiles.get_mut(new_id) else {
            return Err(StoreError::NotFound(new_id.to_string()));
        };
        if profile.referred_by.is_some() {
            return Ok(());
        }
        profile.referred_by = Some(*referrer_id);
        if let Some(referrer) = state.profiles.get_mut(referrer_id) {
            referrer.referral_count += 1;
        }
        Ok(())
    }
}

/// Identity provider that registers users in memory and notifies a
/// `MockProfileStore` the way a database trigger would.
#[cfg(test)]
pub struct MockIdentityProvider {
    store: std::sync::Arc<MockProfileStore>,
    users: parking_lot::Mutex<std::collections::HashMap<String, (String, UserId)>>,
    sessions: parking_lot::Mutex<std::collections::HashMap<String, Session>>,
    pub sign_up_error: parking_lot::Mutex<Option<IdentityError>>,
    pub sign_in_error: parking_lot::Mutex<Option<IdentityError>>,
    pub omit_user_id: std::sync::atomic::AtomicBool,
    pub require_confirmation: std::sync::atomic::AtomicBool,
    pub withhold_session: std::sync::atomic::AtomicBool,
    /// Returns this id from every sign-up, replaying the same user.
    pub fixed_user_id: parking_lot::Mutex<Option<UserId>>,
}

#[cfg(test)]
impl MockIdentityProvider {
    pub fn new(store: std::sync::Arc<MockProfileStore>) -> Self {
        Self {
            store,
            users: Default::default(),
            sessions: Default::default(),
            sign_up_error: Default::default(),
            sign_in_error: Default::default(),
            omit_user_id: Default::default(),
            require_confirmation: Default::default(),
            withhold_session: Default::default(),
            fixed_user_id: Default::default(),
        }
    }

    fn issue(&self, user_id: UserId, email: &str) -> Session {
        let session = Session {
            access_token: format!("token-{user_id}-{}", self.sessions.lock().len()),
            user_id,
            email: email.to_owned(),
            expires_at: None,
        };
        self.sessions
            .lock()
            .insert(session.access_token.clone(), session.clone());
        session
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[cfg(test)]
#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResult, IdentityError> {
        if let Some(err) = self.sign_up_error.lock().clone() {
            return Err(err);
        }
        let fixed = *self.fixed_user_id.lock();
        let user_id = fixed.unwrap_or_else(UserId::new_v4);
        self.users
            .lock()
            .insert(request.email.clone(), (request.password.clone(), user_id));
        self.store
            .on_user_created(user_id, &request.metadata.name, &request.metadata.phone);

        if MockProfileStore::flag(&self.omit_user_id) {
            return Ok(SignUpResult::default());
        }
        let session = if MockProfileStore::flag(&self.require_confirmation) {
            None
        } else {
            Some(self.issue(user_id, &request.email))
        };
        Ok(SignUpResult {
            user_id: Some(user_id),
            session,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, IdentityError> {
        if let Some(err) = self.sign_in_error.lock().clone() {
            return Err(err);
        }
        let found = self.users.lock().get(email).cloned();
        match found {
            Some((stored, id)) if stored == password => {
                if MockProfileStore::flag(&self.withhold_session) {
                    Ok(None)
                } else {
                    Ok(Some(self.issue(id, email)))
                }
            }
            _ => Err(IdentityError::InvalidCredentials),
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError> {
        self.sessions.lock().remove(&session.access_token);
        Ok(())
    }

    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, IdentityError> {
        Ok(self.sessions.lock().get(access_token).cloned())
    }
}

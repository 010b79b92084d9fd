//! Outbound Ports (Driven Ports)

use async_trait::async_trait;
use shared_types::{Profile, StoreError, UserId};

/// Read access to profiles (Driven Port)
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn fetch_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError>;

    /// Profiles whose `referred_by` is `referrer`. Any order.
    async fn list_referrals(&self, referrer: &UserId) -> Result<Vec<Profile>, StoreError>;

    /// Every profile. Any order.
    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError>;
}

#[cfg(test)]
pub struct MockProfileDirectory {
    pub profiles: parking_lot::RwLock<Vec<Profile>>,
    pub fail: std::sync::atomic::AtomicBool,
    pub reads: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockProfileDirectory {
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: parking_lot::RwLock::new(profiles),
            fail: Default::default(),
            reads: Default::default(),
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        self.reads
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("directory disabled".into()));
        }
        Ok(())
    }

    pub fn update(&self, id: &UserId, f: impl FnOnce(&mut Profile)) {
        if let Some(p) = self.profiles.write().iter_mut().find(|p| &p.id == id) {
            f(p);
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ProfileDirectory for MockProfileDirectory {
    async fn fetch_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError> {
        self.check()?;
        Ok(self.profiles.read().iter().find(|p| &p.id == id).cloned())
    }

    async fn list_referrals(&self, referrer: &UserId) -> Result<Vec<Profile>, StoreError> {
        self.check()?;
        Ok(self
            .profiles
            .read()
            .iter()
            .filter(|p| p.referred_by.as_ref() == Some(referrer))
            .cloned()
            .collect())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        self.check()?;
        Ok(self.profiles.read().clone())
    }
}

//! Dashboard Service
//!
//! Assembles the dashboard and admin views from the profile directory and
//! the QR provisioning API.

use async_trait::async_trait;
use rf_02_qr_provisioning::QrProvisioningApi;
use shared_types::UserId;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::{
    newest_first, AdminOverview, CommunityCard, DashboardView, ReferralEntry, ReferralProgress,
};
use crate::error::DashboardError;
use crate::ports::{DashboardApi, ProfileDirectory};

pub struct DashboardService<D: ProfileDirectory, Q: QrProvisioningApi> {
    directory: Arc<D>,
    qr: Arc<Q>,
}

impl<D: ProfileDirectory, Q: QrProvisioningApi> DashboardService<D, Q> {
    pub fn new(directory: Arc<D>, qr: Arc<Q>) -> Self {
        Self { directory, qr }
    }
}

#[async_trait]
impl<D, Q> DashboardApi for DashboardService<D, Q>
where
    D: ProfileDirectory + 'static,
    Q: QrProvisioningApi + 'static,
{
    #[instrument(skip(self), fields(user = %user))]
    async fn dashboard(&self, user: &UserId) -> Result<DashboardView, DashboardError> {
        let mut profile = self
            .directory
            .fetch_profile(user)
            .await?
            .ok_or(DashboardError::ProfileNotFound(*user))?;

        if profile.qr_code_url.is_none() {
            profile.qr_code_url = self.qr.ensure_qr_code(&profile).await;
        }

        let mut referrals = self.directory.list_referrals(user).await?;
        newest_first(&mut referrals);
        debug!(referrals = referrals.len(), "Dashboard loaded");

        Ok(DashboardView {
            progress: ReferralProgress::for_profile(&profile),
            card: CommunityCard::issue(&profile),
            referral_link: self.qr.referral_link(&profile.referral_code),
            share_url: self.qr.referral_share_url(&profile.referral_code),
            qr_code_url: profile.qr_code_url.clone(),
            referrals: referrals.iter().map(ReferralEntry::from).collect(),
            profile,
        })
    }

    async fn admin_overview(&self) -> Result<AdminOverview, DashboardError> {
        let profiles = self.directory.list_profiles().await?;
        Ok(AdminOverview::from_profiles(profiles))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ports::outbound::MockProfileDirectory;
    use chrono::{Duration, Utc};
    use rf_02_qr_provisioning::QrError;
    use shared_types::{Profile, ReferralCode, StoreError};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Fixed-origin QR stub.
    #[derive(Default)]
    pub(crate) struct StubQr {
        pub fail: AtomicBool,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl QrProvisioningApi for StubQr {
        async fn ensure_qr_code(&self, profile: &Profile) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return None;
            }
            Some(format!("qr:{}", profile.referral_code))
        }

        fn global_qr_code(&self) -> Result<String, QrError> {
            Ok("qr:global".into())
        }

        fn referral_link(&self, code: &ReferralCode) -> String {
            format!("https://club.test/register?ref={code}")
        }

        fn registration_link(&self) -> String {
            "https://club.test/register".into()
        }

        fn referral_share_url(&self, code: &ReferralCode) -> String {
            format!("https://wa.me/?text={code}")
        }

        fn registration_share_url(&self) -> String {
            "https://wa.me/?text=register".into()
        }
    }

    pub(crate) fn profile(code: &str, count: u32) -> Profile {
        Profile {
            id: UserId::new_v4(),
            name: Some(format!("member {code}")),
            phone: None,
            referral_code: ReferralCode::from_stored(code),
            referred_by: None,
            referral_count: count,
            qr_code_url: None,
            created_at: Utc::now(),
        }
    }

    fn referred(code: &str, by: &Profile, age_days: i64) -> Profile {
        let mut p = profile(code, 0);
        p.referred_by = Some(by.id);
        p.created_at = Utc::now() - Duration::days(age_days);
        p
    }

    #[tokio::test]
    async fn test_dashboard_locked_profile() {
        let owner = profile("owner1", 2);
        let id = owner.id;
        let directory = Arc::new(MockProfileDirectory::new(vec![owner]));
        let service = DashboardService::new(directory, Arc::new(StubQr::default()));

        let view = service.dashboard(&id).await.unwrap();

        assert!(view.card.is_none());
        assert_eq!(view.progress.remaining, 3);
        assert_eq!(view.referral_link, "https://club.test/register?ref=owner1");
        assert_eq!(view.share_url, "https://wa.me/?text=owner1");
        assert_eq!(view.qr_code_url.as_deref(), Some("qr:owner1"));
    }

    #[tokio::test]
    async fn test_dashboard_unlocked_issues_card() {
        let owner = profile("owner1", 5);
        let id = owner.id;
        let directory = Arc::new(MockProfileDirectory::new(vec![owner]));
        let service = DashboardService::new(directory, Arc::new(StubQr::default()));

        let view = service.dashboard(&id).await.unwrap();

        assert!(view.progress.unlocked);
        assert_eq!(view.card.unwrap().member_name, "member owner1");
    }

    #[tokio::test]
    async fn test_dashboard_referrals_newest_first() {
        let owner = profile("owner1", 2);
        let old = referred("old", &owner, 3);
        let new = referred("new", &owner, 0);
        let stranger = profile("other", 0);
        let id = owner.id;
        let directory = Arc::new(MockProfileDirectory::new(vec![
            owner,
            old.clone(),
            stranger,
            new.clone(),
        ]));
        let service = DashboardService::new(directory, Arc::new(StubQr::default()));

        let view = service.dashboard(&id).await.unwrap();

        let ids: Vec<_> = view.referrals.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
    }

    #[tokio::test]
    async fn test_dashboard_keeps_stored_qr() {
        let mut owner = profile("owner1", 0);
        owner.qr_code_url = Some("data:stored".into());
        let id = owner.id;
        let qr = Arc::new(StubQr::default());
        let directory = Arc::new(MockProfileDirectory::new(vec![owner]));
        let service = DashboardService::new(directory, qr.clone());

        let view = service.dashboard(&id).await.unwrap();

        assert_eq!(view.qr_code_url.as_deref(), Some("data:stored"));
        assert_eq!(qr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dashboard_qr_failure_is_not_fatal() {
        let owner = profile("owner1", 0);
        let id = owner.id;
        let qr = Arc::new(StubQr::default());
        qr.fail.store(true, Ordering::SeqCst);
        let directory = Arc::new(MockProfileDirectory::new(vec![owner]));
        let service = DashboardService::new(directory, qr);

        let view = service.dashboard(&id).await.unwrap();
        assert!(view.qr_code_url.is_none());
    }

    #[tokio::test]
    async fn test_dashboard_missing_profile() {
        let directory = Arc::new(MockProfileDirectory::new(Vec::new()));
        let service = DashboardService::new(directory, Arc::new(StubQr::default()));
        let id = UserId::new_v4();

        let err = service.dashboard(&id).await.unwrap_err();
        assert_eq!(err, DashboardError::ProfileNotFound(id));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let directory = Arc::new(MockProfileDirectory::new(vec![profile("a", 0)]));
        directory.fail.store(true, Ordering::SeqCst);
        let service = DashboardService::new(directory, Arc::new(StubQr::default()));

        let err = service.admin_overview().await.unwrap_err();
        assert!(matches!(err, DashboardError::Store(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_admin_overview_orders_by_count() {
        let directory = Arc::new(MockProfileDirectory::new(vec![
            profile("a", 1),
            profile("b", 7),
            profile("c", 3),
        ]));
        let service = DashboardService::new(directory, Arc::new(StubQr::default()));

        let overview = service.admin_overview().await.unwrap();

        let counts: Vec<_> = overview.profiles.iter().map(|p| p.referral_count).collect();
        assert_eq!(counts, vec![7, 3, 1]);
        assert_eq!(overview.total_referrals, 11);
        assert_eq!(overview.average_referrals, 3.7);
    }
}

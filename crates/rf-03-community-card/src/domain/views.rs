//! Dashboard and admin views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{Profile, UserId};

use super::unlock::{is_unlocked, ReferralProgress};

/// The reward shown once a profile is unlocked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityCard {
    pub member_name: String,
    /// First 8 characters of the profile id, upper-cased.
    pub card_number: String,
}

impl CommunityCard {
    /// Issue the card for `profile`, or `None` while it is locked.
    #[must_use]
    pub fn issue(profile: &Profile) -> Option<Self> {
        if !is_unlocked(profile) {
            return None;
        }
        let card_number = profile
            .id
            .to_string()
            .chars()
            .take(8)
            .collect::<String>()
            .to_uppercase();
        Some(Self {
            member_name: profile.display_name().to_string(),
            card_number,
        })
    }
}

/// One profile referred by the dashboard owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralEntry {
    pub id: UserId,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Profile> for ReferralEntry {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            name: profile.name.clone(),
            created_at: profile.created_at,
        }
    }
}

/// Everything the dashboard page shows for one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardView {
    pub profile: Profile,
    pub progress: ReferralProgress,
    pub card: Option<CommunityCard>,
    pub referral_link: String,
    pub share_url: String,
    pub qr_code_url: Option<String>,
    /// Newest first.
    pub referrals: Vec<ReferralEntry>,
}

/// Sort referrals newest first.
pub fn newest_first(referrals: &mut [Profile]) {
    referrals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// One row of the admin table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfileRow {
    pub id: UserId,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub referral_code: String,
    pub referral_count: u32,
    pub unlocked: bool,
    pub created_at: DateTime<Utc>,
}

/// Aggregate statistics over all profiles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdminOverview {
    pub total_users: usize,
    pub total_referrals: u64,
    /// Rounded to one decimal.
    pub average_referrals: f64,
    /// Ordered by `referral_count`, highest first.
    pub profiles: Vec<AdminProfileRow>,
}

impl AdminOverview {
    #[must_use]
    pub fn from_profiles(mut profiles: Vec<Profile>) -> Self {
        profiles.sort_by(|a, b| b.referral_count.cmp(&a.referral_count));

        let total_users = profiles.len();
        let total_referrals: u64 = profiles.iter().map(|p| u64::from(p.referral_count)).sum();
        let average_referrals = if total_users == 0 {
            0.0
        } else {
            let avg = total_referrals as f64 / total_users as f64;
            (avg * 10.0).round() / 10.0
        };

        let rows = profiles
            .iter()
            .map(|p| AdminProfileRow {
                id: p.id,
                name: p.name.clone(),
                phone: p.phone.clone(),
                referral_code: p.referral_code.to_string(),
                referral_count: p.referral_count,
                unlocked: is_unlocked(p),
                created_at: p.created_at,
            })
            .collect();

        Self {
            total_users,
            total_referrals,
            average_referrals,
            profiles: rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shared_types::ReferralCode;

    fn profile(count: u32) -> Profile {
        Profile {
            id: UserId::new_v4(),
            name: Some("Ada Lovelace".into()),
            phone: None,
            referral_code: ReferralCode::from_stored("abc"),
            referred_by: None,
            referral_count: count,
            qr_code_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_card_only_when_unlocked() {
        assert!(CommunityCard::issue(&profile(4)).is_none());
        assert!(CommunityCard::issue(&profile(5)).is_some());
    }

    #[test]
    fn test_card_number_is_upper_id_prefix() {
        let mut p = profile(5);
        p.id = UserId::parse("a1b2c3d4-0000-4000-8000-000000000000").unwrap();
        let card = CommunityCard::issue(&p).unwrap();
        assert_eq!(card.card_number, "A1B2C3D4");
        assert_eq!(card.member_name, "Ada Lovelace");
    }

    #[test]
    fn test_newest_first() {
        let now = Utc::now();
        let mut old = profile(0);
        old.created_at = now - Duration::days(2);
        let mut new = profile(0);
        new.created_at = now;
        let mut list = vec![old.clone(), new.clone()];

        newest_first(&mut list);
        assert_eq!(list[0].id, new.id);
        assert_eq!(list[1].id, old.id);
    }

    #[test]
    fn test_admin_overview_stats() {
        let overview = AdminOverview::from_profiles(vec![profile(1), profile(6), profile(0)]);

        assert_eq!(overview.total_users, 3);
        assert_eq!(overview.total_referrals, 7);
        assert_eq!(overview.average_referrals, 2.3);
        assert_eq!(overview.profiles[0].referral_count, 6);
        assert!(overview.profiles[0].unlocked);
        assert!(!overview.profiles[1].unlocked);
    }

    #[test]
    fn test_admin_overview_empty() {
        let overview = AdminOverview::from_profiles(Vec::new());
        assert_eq!(overview.total_users, 0);
        assert_eq!(overview.average_referrals, 0.0);
    }
}

//! # Session State
//!
//! Sessions are passed into services as values. A caller that holds no
//! session passes `SessionState::SignedOut`.

use crate::entities::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated session issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token presented on later requests.
    pub access_token: String,
    pub user_id: UserId,
    pub email: String,
    /// Expiry reported by the provider, if any.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Authentication state of a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    /// No session.
    #[default]
    SignedOut,
    /// Account created, email confirmation still required.
    PendingConfirmation { user_id: UserId, email: String },
    /// Active session.
    SignedIn(Session),
}

impl SessionState {
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        matches!(self, SessionState::SignedIn(_))
    }

    /// The active session, if signed in.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::SignedIn(session) => Some(session),
            _ => None,
        }
    }

    /// User the state refers to, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            SessionState::SignedOut => None,
            SessionState::PendingConfirmation { user_id, .. } => Some(*user_id),
            SessionState::SignedIn(session) => Some(session.user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_at: Option<DateTime<Utc>>) -> Session {
        Session {
            access_token: "token".into(),
            user_id: UserId::new_v4(),
            email: "a@example.com".into(),
            expires_at,
        }
    }

    #[test]
    fn test_default_is_signed_out() {
        let state = SessionState::default();
        assert!(!state.is_signed_in());
        assert!(state.user_id().is_none());
    }

    #[test]
    fn test_pending_confirmation_has_user() {
        let id = UserId::new_v4();
        let state = SessionState::PendingConfirmation {
            user_id: id,
            email: "a@example.com".into(),
        };
        assert_eq!(state.user_id(), Some(id));
        assert!(state.session().is_none());
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        assert!(!session(None).is_expired_at(now));
        assert!(session(Some(now - Duration::seconds(1))).is_expired_at(now));
        assert!(!session(Some(now + Duration::hours(1))).is_expired_at(now));
    }

    #[test]
    fn test_serializes_with_status_tag() {
        let json = serde_json::to_value(SessionState::SignedOut).unwrap();
        assert_eq!(json["status"], "signed_out");
    }
}

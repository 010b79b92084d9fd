//! Session Service
//!
//! Sign-in, sign-out and bearer token resolution over the identity provider.

use async_trait::async_trait;
use chrono::Utc;
use shared_types::{IdentityError, Session, SessionState};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::LoginForm;
use crate::error::SessionError;
use crate::ports::{IdentityProvider, SessionApi};

pub struct SessionService<I: IdentityProvider> {
    identity: Arc<I>,
}

impl<I: IdentityProvider> SessionService<I> {
    pub fn new(identity: Arc<I>) -> Self {
        Self { identity }
    }
}

fn map_sign_in_error(err: IdentityError) -> SessionError {
    match err {
        IdentityError::InvalidCredentials => SessionError::InvalidCredentials,
        IdentityError::EmailNotConfirmed => SessionError::EmailNotConfirmed,
        IdentityError::RateLimited => SessionError::RateLimited,
        IdentityError::InvalidInput(msg) => SessionError::UserInput(msg),
        other => SessionError::Provider(other.to_string()),
    }
}

#[async_trait]
impl<I: IdentityProvider + 'static> SessionApi for SessionService<I> {
    async fn sign_in(&self, form: LoginForm) -> Result<SessionState, SessionError> {
        let email = form.validated_email()?;

        let session = self
            .identity
            .sign_in(email, &form.password)
            .await
            .map_err(|e| {
                warn!(email = %email, error = %e, "Sign-in rejected");
                map_sign_in_error(e)
            })?
            .ok_or(SessionError::SessionNotEstablished)?;

        info!(user = %session.user_id, "Signed in");
        Ok(SessionState::SignedIn(session))
    }

    async fn sign_out(&self, session: &Session) -> SessionState {
        if let Err(e) = self.identity.sign_out(session).await {
            warn!(user = %session.user_id, error = %e, "Provider sign-out failed");
        } else {
            info!(user = %session.user_id, "Signed out");
        }
        SessionState::SignedOut
    }

    async fn current_session(&self, access_token: Option<&str>) -> SessionState {
        let Some(token) = access_token.map(str::trim).filter(|t| !t.is_empty()) else {
            return SessionState::SignedOut;
        };

        match self.identity.get_session(token).await {
            Ok(Some(session)) if !session.is_expired_at(Utc::now()) => {
                SessionState::SignedIn(session)
            }
            Ok(Some(session)) => {
                debug!(user = %session.user_id, "Session expired");
                SessionState::SignedOut
            }
            Ok(None) => SessionState::SignedOut,
            Err(e) => {
                warn!(error = %e, "Session lookup failed");
                SessionState::SignedOut
            }
        }
    }
}

//! Bearer token extraction.
//!
//! Tokens are opaque here; the session API decides what they mean.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use shared_types::{Session, SessionState};
use std::convert::Infallible;
use tracing::debug;

use crate::domain::error::GatewayError;
use crate::router::AppState;

/// Token from `Authorization: Bearer <token>`, if present and well-formed.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// The caller's session state. Missing or unknown tokens yield `SignedOut`.
pub struct CallerSession(pub SessionState);

#[async_trait]
impl FromRequestParts<AppState> for CallerSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers);
        let session = state.sessions.current_session(token.as_deref()).await;
        Ok(Self(session))
    }
}

/// A signed-in caller. Rejects with 401 otherwise.
pub struct SignedIn(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for SignedIn {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CallerSession(caller) = match CallerSession::from_request_parts(parts, state).await {
            Ok(caller) => caller,
            Err(never) => match never {},
        };
        match caller {
            SessionState::SignedIn(session) => Ok(Self(session)),
            other => {
                debug!(path = %parts.uri.path(), state = ?other, "Rejected unauthenticated request");
                Err(GatewayError::unauthorized())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc".into()));
        assert_eq!(bearer_token(&headers("bearer  abc ")), Some("abc".into()));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}

//! # Supabase REST Platform
//!
//! Talks to a hosted platform over HTTP:
//!
//! - GoTrue (`/auth/v1`) for identities and sessions
//! - PostgREST (`/rest/v1`) for profile rows and the three procedures
//!
//! Auth calls carry the public anon key. Profile rows sit behind row-level
//! security, so every PostgREST call is made with the service-role key.
//!
//! Successful writes are also published on the local bus so in-process
//! dashboard mirrors follow changes made through this runtime.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use rf_01_registration::{IdentityProvider, ProfileStore, SignUpRequest, SignUpResult};
use rf_02_qr_provisioning::QrCodeStore;
use rf_03_community_card::ProfileDirectory;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use shared_bus::{EventPublisher, InMemoryEventBus, ProfileEvent};
use shared_types::{
    IdentityError, NewProfile, Profile, ReferralCode, Session, StoreError, UserId,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const PROFILES: &str = "rest/v1/profiles";

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
}

/// `/token` and `/signup` body. Sign-up without a session returns the bare user.
#[derive(Debug, Deserialize)]
struct GoTrueResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<GoTrueUser>,
    #[serde(default)]
    id: Option<UserId>,
    #[serde(default)]
    email: Option<String>,
}

impl GoTrueResponse {
    fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id).or(self.id)
    }

    fn session(&self, fallback_email: &str) -> Option<Session> {
        let token = self.access_token.clone()?;
        let user_id = self.user_id()?;
        let email = self
            .user
            .as_ref()
            .and_then(|u| u.email.clone())
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| fallback_email.to_string());
        Some(Session {
            access_token: token,
            user_id,
            email,
            expires_at: self
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        })
    }
}

/// Error body; GoTrue and PostgREST use different keys.
#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl ErrorPayload {
    fn text(&self) -> String {
        self.msg
            .clone()
            .or_else(|| self.error_description.clone())
            .or_else(|| self.message.clone())
            .unwrap_or_default()
    }
}

/// Non-success response, read once.
struct Failure {
    status: StatusCode,
    message: String,
    details: String,
}

impl Failure {
    async fn read(response: Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let payload: ErrorPayload = serde_json::from_str(&body).unwrap_or_default();
        let mut message = payload.text();
        if message.is_empty() {
            message = body;
        }
        Self {
            status,
            message,
            details: payload.details.unwrap_or_default(),
        }
    }

    fn into_identity(self) -> IdentityError {
        let lower = self.message.to_lowercase();
        match self.status {
            StatusCode::TOO_MANY_REQUESTS => IdentityError::RateLimited,
            s if s.is_server_error() => IdentityError::Unavailable(self.message),
            _ if lower.contains("already registered") || lower.contains("already exists") => {
                IdentityError::AlreadyRegistered
            }
            _ if lower.contains("not confirmed") => IdentityError::EmailNotConfirmed,
            _ if lower.contains("invalid login credentials") => IdentityError::InvalidCredentials,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                IdentityError::InvalidInput(self.message)
            }
            s => IdentityError::Provider(format!("{s}: {}", self.message)),
        }
    }

    fn into_store(self, subject: &str) -> StoreError {
        match self.status {
            StatusCode::TOO_MANY_REQUESTS => StoreError::Unavailable("rate limited".into()),
            s if s.is_server_error() => StoreError::Unavailable(self.message),
            StatusCode::CONFLICT => {
                if self.message.contains("referral_code") || self.details.contains("referral_code")
                {
                    StoreError::CodeTaken(subject.to_string())
                } else {
                    StoreError::AlreadyExists(subject.to_string())
                }
            }
            StatusCode::NOT_FOUND => StoreError::NotFound(subject.to_string()),
            s => StoreError::Rejected(format!("{s}: {}", self.message)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("Invalid platform URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

/// Platform reached over its REST APIs.
pub struct SupabasePlatform {
    client: Client,
    base: Url,
    anon_key: String,
    service_key: String,
    events: Arc<InMemoryEventBus>,
}

impl SupabasePlatform {
    pub fn new(
        base_url: &str,
        anon_key: &str,
        service_key: &str,
        events: Arc<InMemoryEventBus>,
    ) -> Result<Self, SupabaseError> {
        let mut base = Url::parse(base_url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base,
            anon_key: anon_key.to_string(),
            service_key: service_key.to_string(),
            events,
        })
    }

    pub fn events(&self) -> &Arc<InMemoryEventBus> {
        &self.events
    }

    fn url(&self, path: &str) -> Result<Url, String> {
        self.base.join(path).map_err(|e| e.to_string())
    }

    /// Auth request with the anon key, authorized as `bearer` or anonymous.
    fn request(
        &self,
        method: reqwest::Method,
        url: Url,
        bearer: Option<&str>,
    ) -> RequestBuilder {
        let token = bearer.unwrap_or(&self.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {token}"))
    }

    /// PostgREST request under the service role.
    fn store_request(&self, method: reqwest::Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    async fn send_auth(&self, request: RequestBuilder) -> Result<Response, IdentityError> {
        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Failure::read(response).await.into_identity())
        }
    }

    async fn send_store(
        &self,
        request: RequestBuilder,
        subject: &str,
    ) -> Result<Response, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Failure::read(response).await.into_store(subject))
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        response
            .json()
            .await
            .map_err(|e| StoreError::Rejected(format!("unexpected response: {e}")))
    }

    async fn rpc(
        &self,
        name: &str,
        args: serde_json::Value,
        subject: &str,
    ) -> Result<Response, StoreError> {
        let url = self
            .url(&format!("rest/v1/rpc/{name}"))
            .map_err(StoreError::Rejected)?;
        debug!(procedure = name, "Calling platform procedure");
        self.send_store(
            self.store_request(reqwest::Method::POST, url).json(&args),
            subject,
        )
        .await
    }

    async fn select_profiles(&self, query: &[(&str, String)]) -> Result<Vec<Profile>, StoreError> {
        let url = self.url(PROFILES).map_err(StoreError::Rejected)?;
        let request = self
            .store_request(reqwest::Method::GET, url)
            .query(&[("select", "*")])
            .query(query);
        let response = self.send_store(request, "profiles").await?;
        Self::decode(response).await
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

#[async_trait]
impl IdentityProvider for SupabasePlatform {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResult, IdentityError> {
        let url = self
            .url("auth/v1/signup")
            .map_err(IdentityError::Provider)?;
        let body = json!({
            "email": request.email,
            "password": request.password,
            "data": {
                "name": request.metadata.name,
                "phone": request.metadata.phone,
            },
        });
        let response = self
            .send_auth(self.request(reqwest::Method::POST, url, None).json(&body))
            .await?;
        let parsed: GoTrueResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;

        Ok(SignUpResult {
            user_id: parsed.user_id(),
            session: parsed.session(&request.email),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, IdentityError> {
        let mut url = self
            .url("auth/v1/token")
            .map_err(IdentityError::Provider)?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let response = self
            .send_auth(
                self.request(reqwest::Method::POST, url, None)
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        let parsed: GoTrueResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;
        Ok(parsed.session(email))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError> {
        let url = self
            .url("auth/v1/logout")
            .map_err(IdentityError::Provider)?;
        self.send_auth(self.request(reqwest::Method::POST, url, Some(&session.access_token)))
            .await?;
        Ok(())
    }

    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, IdentityError> {
        let url = self.url("auth/v1/user").map_err(IdentityError::Provider)?;
        let response = self
            .request(reqwest::Method::GET, url, Some(access_token))
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Ok(None),
            s if !s.is_success() => return Err(Failure::read(response).await.into_identity()),
            _ => {}
        }

        let user: GoTrueUser = response
            .json()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;
        Ok(Some(Session {
            access_token: access_token.to_string(),
            user_id: user.id,
            email: user.email.unwrap_or_default(),
            expires_at: None,
        }))
    }
}

// =============================================================================
// PROFILE STORE
// =============================================================================

#[async_trait]
impl ProfileStore for SupabasePlatform {
    async fn fetch_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError> {
        let rows = self.select_profiles(&[("id", format!("eq.{id}"))]).await?;
        Ok(rows.into_iter().next())
    }

    async fn validate_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<UserId>, StoreError> {
        let response = self
            .rpc(
                "validate_referral_code",
                json!({ "code": code.as_str() }),
                code.as_str(),
            )
            .await?;
        Self::decode(response).await
    }

    async fn create_profile(
        &self,
        id: &UserId,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), StoreError> {
        let subject = id.to_string();
        self.rpc(
            "create_profile",
            json!({ "user_id": id, "user_name": name, "user_phone": phone }),
            &subject,
        )
        .await?;
        if let Some(profile) = ProfileStore::fetch_profile(self, id).await? {
            self.events
                .publish(ProfileEvent::ProfileCreated {
                    profile_id: profile.id,
                    referral_code: profile.referral_code,
                })
                .await;
        }
        Ok(())
    }

    async fn insert_profile(&self, row: &NewProfile) -> Result<(), StoreError> {
        let url = self.url(PROFILES).map_err(StoreError::Rejected)?;
        let request = self
            .store_request(reqwest::Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(row);
        self.send_store(request, &row.id.to_string()).await?;
        self.events
            .publish(ProfileEvent::ProfileCreated {
                profile_id: row.id,
                referral_code: row.referral_code.clone(),
            })
            .await;
        Ok(())
    }

    async fn apply_referral(
        &self,
        new_id: &UserId,
        referrer_id: &UserId,
    ) -> Result<(), StoreError> {
        let subject = new_id.to_string();
        let Some(before) = ProfileStore::fetch_profile(self, new_id).await? else {
            return Err(StoreError::NotFound(subject));
        };
        if before.referred_by.is_some() {
            debug!(user = %new_id, "Profile already referred, procedure not called");
            return Ok(());
        }

        self.rpc(
            "apply_referral",
            json!({ "new_user_id": new_id, "referrer_id": referrer_id }),
            &subject,
        )
        .await?;

        // Only a link this call made is announced.
        match ProfileStore::fetch_profile(self, new_id).await {
            Ok(Some(after)) if after.referred_by == Some(*referrer_id) => {
                self.events
                    .publish(ProfileEvent::ReferralApplied {
                        referrer_id: *referrer_id,
                        referred_id: *new_id,
                    })
                    .await;
            }
            Ok(_) => debug!(user = %new_id, "Procedure left the profile unchanged"),
            Err(e) => warn!(user = %new_id, error = %e, "Could not re-read profile after referral"),
        }
        Ok(())
    }
}

// =============================================================================
// QR STORE
// =============================================================================

#[async_trait]
impl QrCodeStore for SupabasePlatform {
    async fn save_qr_code_url(&self, id: &UserId, url: &str) -> Result<(), StoreError> {
        let endpoint = self.url(PROFILES).map_err(StoreError::Rejected)?;
        let request = self
            .store_request(reqwest::Method::PATCH, endpoint)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&json!({ "qr_code_url": url }));
        let response = self.send_store(request, &id.to_string()).await?;
        let rows: Vec<Profile> = Self::decode(response).await?;
        if rows.is_empty() {
            warn!(user = %id, "QR update matched no profile");
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.events
            .publish(ProfileEvent::ProfileUpdated { profile_id: *id })
            .await;
        Ok(())
    }
}

// =============================================================================
// DIRECTORY
// =============================================================================

#[async_trait]
impl ProfileDirectory for SupabasePlatform {
    async fn fetch_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError> {
        ProfileStore::fetch_profile(self, id).await
    }

    async fn list_referrals(&self, referrer: &UserId) -> Result<Vec<Profile>, StoreError> {
        self.select_profiles(&[
            ("referred_by", format!("eq.{referrer}")),
            ("order", "created_at.desc".to_string()),
        ])
        .await
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        self.select_profiles(&[("order", "referral_count.desc".to_string())])
            .await
    }
}

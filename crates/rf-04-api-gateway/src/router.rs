//! Routes and request handlers.
//!
//! | Method | Path                    | Auth     |
//! |--------|-------------------------|----------|
//! | POST   | `/register?ref=`        | optional |
//! | POST   | `/login`                | none     |
//! | POST   | `/logout`               | bearer   |
//! | GET    | `/session`              | optional |
//! | GET    | `/referral-codes/:code` | none     |
//! | GET    | `/dashboard`            | bearer   |
//! | GET    | `/admin/overview`       | bearer   |
//! | GET    | `/qr/global`            | none     |
//! | GET    | `/health`               | none     |

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use rf_01_registration::{
    LoginForm, ReferralLookup, RegistrationApi, RegistrationForm, RegistrationOutcome, SessionApi,
};
use rf_02_qr_provisioning::QrProvisioningApi;
use rf_03_community_card::{AdminOverview, DashboardApi, DashboardView};
use serde::{Deserialize, Serialize};
use shared_types::SessionState;
use std::sync::Arc;
use tracing::info;

use crate::domain::error::GatewayError;
use crate::middleware::{CallerSession, SignedIn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registration: Arc<dyn RegistrationApi>,
    pub sessions: Arc<dyn SessionApi>,
    pub qr: Arc<dyn QrProvisioningApi>,
    pub dashboards: Arc<dyn DashboardApi>,
}

/// All routes, without middleware layers.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(current_session))
        .route("/referral-codes/:code", get(check_referral_code))
        .route("/dashboard", get(dashboard))
        .route("/admin/overview", get(admin_overview))
        .route("/qr/global", get(global_qr))
        .route("/health", get(health_check))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterQuery {
    #[serde(rename = "ref")]
    pub referral: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    #[serde(flatten)]
    pub outcome: RegistrationOutcome,
    pub warnings: Vec<&'static str>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReferralCodeCheck {
    pub valid: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GlobalQr {
    pub qr_code_url: String,
    pub registration_link: String,
    pub share_url: String,
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, GatewayError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| GatewayError::InvalidInput(rejection.body_text()))
}

async fn register(
    State(state): State<AppState>,
    Query(query): Query<RegisterQuery>,
    CallerSession(caller): CallerSession,
    body: Result<Json<RegistrationForm>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), GatewayError> {
    let form = json_body(body)?.with_query_ref(query.referral.as_deref());
    let outcome = state.registration.register(&caller, form).await?;

    info!(
        user = %outcome.profile.id,
        pending_confirmation = outcome.is_pending_confirmation(),
        "Registration completed"
    );
    let warnings = outcome.warnings();
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { outcome, warnings }),
    ))
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginForm>, JsonRejection>,
) -> Result<Json<SessionState>, GatewayError> {
    let form = json_body(body)?;
    Ok(Json(state.sessions.sign_in(form).await?))
}

async fn logout(State(state): State<AppState>, SignedIn(session): SignedIn) -> StatusCode {
    state.sessions.sign_out(&session).await;
    StatusCode::NO_CONTENT
}

async fn current_session(CallerSession(caller): CallerSession) -> Json<SessionState> {
    Json(caller)
}

async fn check_referral_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ReferralCodeCheck>, GatewayError> {
    let lookup = state.registration.validate_referral_code(&code).await?;
    Ok(Json(ReferralCodeCheck {
        valid: matches!(lookup, ReferralLookup::Found(_)),
    }))
}

async fn dashboard(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
) -> Result<Json<DashboardView>, GatewayError> {
    Ok(Json(state.dashboards.dashboard(&session.user_id).await?))
}

async fn admin_overview(
    State(state): State<AppState>,
    SignedIn(_): SignedIn,
) -> Result<Json<AdminOverview>, GatewayError> {
    Ok(Json(state.dashboards.admin_overview().await?))
}

async fn global_qr(State(state): State<AppState>) -> Result<Json<GlobalQr>, GatewayError> {
    Ok(Json(GlobalQr {
        qr_code_url: state.qr.global_qr_code()?,
        registration_link: state.qr.registration_link(),
        share_url: state.qr.registration_share_url(),
    }))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "api-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use parking_lot::Mutex;
    use rf_01_registration::{
        ReferralLookupUnavailable, ReferralStatus, RegistrationError, SessionError,
    };
    use rf_02_qr_provisioning::QrError;
    use rf_03_community_card::{DashboardError, ReferralProgress};
    use serde_json::Value;
    use shared_types::{Profile, ReferralCode, Session, UserId};
    use tower::ServiceExt;

    const TOKEN: &str = "tok-1";

    fn signed_in_user() -> UserId {
        UserId::parse("11111111-2222-4333-8444-555555555555").unwrap()
    }

    fn session() -> Session {
        Session {
            access_token: TOKEN.into(),
            user_id: signed_in_user(),
            email: "ada@example.com".into(),
            expires_at: None,
        }
    }

    fn profile(id: UserId) -> Profile {
        Profile {
            id,
            name: Some("Ada".into()),
            phone: Some("555".into()),
            referral_code: ReferralCode::from_stored("ada12345"),
            referred_by: None,
            referral_count: 0,
            qr_code_url: None,
            created_at: Utc::now(),
        }
    }

    #[derive(Default)]
    struct StubRegistration {
        last_form: Mutex<Option<RegistrationForm>>,
    }

    #[async_trait]
    impl RegistrationApi for StubRegistration {
        async fn register(
            &self,
            state: &SessionState,
            form: RegistrationForm,
        ) -> Result<RegistrationOutcome, RegistrationError> {
            if state.is_signed_in() {
                return Err(RegistrationError::AlreadySignedIn);
            }
            let validated = form.validate(6)?;
            *self.last_form.lock() = Some(form);
            let referral = match validated.referral_code.as_deref() {
                Some("bogus") => ReferralStatus::InvalidCode,
                Some(_) => ReferralStatus::Applied {
                    referrer_id: signed_in_user(),
                },
                None => ReferralStatus::NotRequested,
            };
            let id = UserId::new_v4();
            Ok(RegistrationOutcome {
                profile: profile(id),
                session: SessionState::PendingConfirmation {
                    user_id: id,
                    email: validated.email,
                },
                referral,
            })
        }

        async fn validate_referral_code(
            &self,
            raw: &str,
        ) -> Result<ReferralLookup, ReferralLookupUnavailable> {
            match raw {
                "ada12345" => Ok(ReferralLookup::Found(signed_in_user())),
                "down" => Err(ReferralLookupUnavailable("store offline".into())),
                _ => Ok(ReferralLookup::NotFound),
            }
        }
    }

    #[derive(Default)]
    struct StubSessions {
        signed_out: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SessionApi for StubSessions {
        async fn sign_in(&self, form: LoginForm) -> Result<SessionState, SessionError> {
            form.validated_email()?;
            if form.password == "secret" {
                Ok(SessionState::SignedIn(session()))
            } else {
                Err(SessionError::InvalidCredentials)
            }
        }

        async fn sign_out(&self, session: &Session) -> SessionState {
            self.signed_out.lock().push(session.access_token.clone());
            SessionState::SignedOut
        }

        async fn current_session(&self, access_token: Option<&str>) -> SessionState {
            match access_token {
                Some(TOKEN) => SessionState::SignedIn(session()),
                _ => SessionState::SignedOut,
            }
        }
    }

    struct StubQr;

    #[async_trait]
    impl QrProvisioningApi for StubQr {
        async fn ensure_qr_code(&self, _profile: &Profile) -> Option<String> {
            Some("data:qr".into())
        }

        fn global_qr_code(&self) -> Result<String, QrError> {
            Ok("data:global".into())
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
            "https://wa.me/?text=join".into()
        }
    }

    struct StubDashboards;

    #[async_trait]
    impl DashboardApi for StubDashboards {
        async fn dashboard(&self, user: &UserId) -> Result<DashboardView, DashboardError> {
            if *user != signed_in_user() {
                return Err(DashboardError::ProfileNotFound(*user));
            }
            let profile = profile(*user);
            Ok(DashboardView {
                progress: ReferralProgress::for_profile(&profile),
                card: None,
                referral_link: "https://club.test/register?ref=ada12345".into(),
                share_url: "https://wa.me/?text=ada12345".into(),
                qr_code_url: Some("data:qr".into()),
                referrals: Vec::new(),
                profile,
            })
        }

        async fn admin_overview(&self) -> Result<AdminOverview, DashboardError> {
            Ok(AdminOverview::from_profiles(vec![profile(signed_in_user())]))
        }
    }

    struct Harness {
        registration: Arc<StubRegistration>,
        sessions: Arc<StubSessions>,
        router: Router,
    }

    fn harness() -> Harness {
        let registration = Arc::new(StubRegistration::default());
        let sessions = Arc::new(StubSessions::default());
        let state = AppState {
            registration: registration.clone(),
            sessions: sessions.clone(),
            qr: Arc::new(StubQr),
            dashboards: Arc::new(StubDashboards),
        };
        Harness {
            registration,
            sessions,
            router: routes(state),
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_authed(uri: &str) -> Request<Body> {
        Request::get(uri)
            .header("authorization", format!("Bearer {TOKEN}"))
            .body(Body::empty())
            .unwrap()
    }

    fn registration_body() -> Value {
        serde_json::json!({
            "name": "Grace",
            "email": "grace@example.com",
            "phone": "555-0101",
            "password": "hunter22"
        })
    }

    #[tokio::test]
    async fn test_register_created() {
        let h = harness();
        let (status, body) = send(&h.router, post_json("/register", registration_body())).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["session"]["status"], "pending_confirmation");
        assert_eq!(body["referral"]["status"], "not_requested");
        assert_eq!(body["warnings"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_register_uses_query_ref() {
        let h = harness();
        let (status, body) = send(
            &h.router,
            post_json("/register?ref=%20ada12345%20", registration_body()),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["referral"]["status"], "applied");
        let form = h.registration.last_form.lock().clone().unwrap();
        assert_eq!(form.referral_code.as_deref(), Some("ada12345"));
    }

    #[tokio::test]
    async fn test_register_body_code_wins_over_query() {
        let h = harness();
        let mut body = registration_body();
        body["referral_code"] = "bogus".into();
        let (status, body) = send(&h.router, post_json("/register?ref=ada12345", body)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["warnings"], serde_json::json!(["Invalid referral code"]));
    }

    #[tokio::test]
    async fn test_register_missing_field_is_bad_request() {
        let h = harness();
        let mut body = registration_body();
        body.as_object_mut().unwrap().remove("name");
        let (status, body) = send(&h.router, post_json("/register", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
        assert_eq!(body["message"], "Full name is required");
    }

    #[tokio::test]
    async fn test_register_malformed_json_is_bad_request() {
        let h = harness();
        let request = Request::post("/register")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&h.router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_register_while_signed_in_conflicts() {
        let h = harness();
        let mut request = post_json("/register", registration_body());
        request
            .headers_mut()
            .insert("authorization", format!("Bearer {TOKEN}").parse().unwrap());
        let (status, body) = send(&h.router, request).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "already_signed_in");
    }

    #[tokio::test]
    async fn test_login_and_bad_credentials() {
        let h = harness();
        let (status, body) = send(
            &h.router,
            post_json(
                "/login",
                serde_json::json!({"email": "ada@example.com", "password": "secret"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "signed_in");
        assert_eq!(body["access_token"], TOKEN);

        let (status, body) = send(
            &h.router,
            post_json(
                "/login",
                serde_json::json!({"email": "ada@example.com", "password": "nope"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_logout_requires_session() {
        let h = harness();
        let request = Request::post("/logout").body(Body::empty()).unwrap();
        let (status, _) = send(&h.router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::post("/logout")
            .header("authorization", format!("Bearer {TOKEN}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&h.router, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(*h.sessions.signed_out.lock(), vec![TOKEN.to_string()]);
    }

    #[tokio::test]
    async fn test_session_reports_state() {
        let h = harness();
        let (_, body) = send(
            &h.router,
            Request::get("/session").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(body["status"], "signed_out");

        let (_, body) = send(&h.router, get_authed("/session")).await;
        assert_eq!(body["status"], "signed_in");
    }

    #[tokio::test]
    async fn test_referral_code_check() {
        let h = harness();
        let get = |uri: &str| Request::get(uri).body(Body::empty()).unwrap();

        let (status, body) = send(&h.router, get("/referral-codes/ada12345")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);

        let (_, body) = send(&h.router, get("/referral-codes/nobody")).await;
        assert_eq!(body["valid"], false);

        let (status, body) = send(&h.router, get("/referral-codes/down")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "unavailable");
    }

    #[tokio::test]
    async fn test_dashboard_requires_bearer() {
        let h = harness();
        let (status, body) = send(
            &h.router,
            Request::get("/dashboard").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");

        let (status, body) = send(&h.router, get_authed("/dashboard")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["qr_code_url"], "data:qr");
        assert_eq!(body["progress"]["remaining"], 5);
    }

    #[tokio::test]
    async fn test_admin_overview() {
        let h = harness();
        let (status, body) = send(&h.router, get_authed("/admin/overview")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_users"], 1);
    }

    #[tokio::test]
    async fn test_global_qr_and_health() {
        let h = harness();
        let (status, body) = send(
            &h.router,
            Request::get("/qr/global").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["qr_code_url"], "data:global");
        assert_eq!(body["registration_link"], "https://club.test/register");

        let (status, body) = send(
            &h.router,
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }
}

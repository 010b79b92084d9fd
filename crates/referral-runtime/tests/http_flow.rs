//! The full HTTP surface over the in-memory runtime.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use referral_runtime::{ReferralRuntime, RuntimeConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router() -> Router {
    let runtime = ReferralRuntime::new(RuntimeConfig::default()).unwrap();
    runtime.gateway().unwrap().router()
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

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn member(name: &str) -> Value {
    json!({
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
        "phone": "555-0100",
        "password": "secret1"
    })
}

/// Register and return `(access_token, referral_code)`.
async fn register(router: &Router, uri: &str, name: &str) -> (String, String) {
    let (status, body) = send(router, post_json(uri, member(name))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["session"]["access_token"].as_str().unwrap().to_string(),
        body["profile"]["referral_code"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_referral_link_flow_unlocks_card() {
    let router = router();
    let (token, code) = register(&router, "/register", "Alice").await;

    let preview = format!("/referral-codes/{}", code.to_uppercase());
    let (status, body) = send(&router, get(&preview, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    for name in ["Bob", "Carol", "Dave", "Erin"] {
        register(&router, &format!("/register?ref={code}"), name).await;
    }

    let (status, body) = send(&router, get("/dashboard", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"]["count"], 4);
    assert_eq!(body["progress"]["remaining"], 1);
    assert!(body["card"].is_null());
    assert!(body["referral_link"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/register?ref={code}")));

    register(&router, &format!("/register?ref={code}"), "Frank").await;

    let (_, body) = send(&router, get("/dashboard", Some(&token))).await;
    assert_eq!(body["progress"]["unlocked"], true);
    assert_eq!(body["card"]["member_name"], "Alice");
    assert_eq!(body["referrals"].as_array().unwrap().len(), 5);
    assert!(body["qr_code_url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/svg+xml;base64,"));

    let (status, body) = send(&router, get("/admin/overview", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_users"], 6);
    assert_eq!(body["profiles"][0]["referral_code"], code);
}

#[tokio::test]
async fn test_unknown_code_is_reported_as_warning() {
    let router = router();
    let (status, body) = send(
        &router,
        post_json("/register?ref=nosuchcode", member("Lost")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["referral"]["status"], "invalid_code");
    assert_eq!(body["warnings"], json!(["Invalid referral code"]));
}

#[tokio::test]
async fn test_session_lifecycle() {
    let router = router();
    let (token, _) = register(&router, "/register", "Alice").await;

    let (_, body) = send(&router, get("/session", Some(&token))).await;
    assert_eq!(body["status"], "signed_in");

    let (status, body) = send(&router, post_json("/register", member("Again"))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let logout = Request::post("/logout")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, logout).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&router, get("/session", Some(&token))).await;
    assert_eq!(body["status"], "signed_out");

    let (status, body) = send(
        &router,
        post_json(
            "/login",
            json!({ "email": "alice@example.com", "password": "secret1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "signed_in");

    let (status, body) = send(
        &router,
        post_json(
            "/login",
            json!({ "email": "alice@example.com", "password": "wrong-password" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_signed_in_caller_cannot_register() {
    let router = router();
    let (token, _) = register(&router, "/register", "Alice").await;

    let request = Request::post("/register")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(member("Bob").to_string()))
        .unwrap();
    let (status, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_signed_in");
}

#[tokio::test]
async fn test_input_errors() {
    let router = router();

    let (status, body) = send(
        &router,
        post_json("/register", json!({ "email": "x@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Full name is required");

    register(&router, "/register", "Alice").await;
    let (status, body) = send(&router, post_json("/register", member("Alice"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already registered");
}

#[tokio::test]
async fn test_protected_routes_need_bearer() {
    let router = router();
    for uri in ["/dashboard", "/admin/overview"] {
        let (status, body) = send(&router, get(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_public_routes() {
    let router = router();

    let (status, body) = send(&router, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&router, get("/qr/global", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["registration_link"], "http://localhost:8080/register");
    assert!(body["share_url"].as_str().unwrap().starts_with("https://wa.me/?text="));
}

//! Router tests driven in-process with `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::net::{IpAddr, Ipv4Addr};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

use yard_patrol_core::billing::BillingCatalog;
use yard_patrol_site::config::{AdminCredentialsConfig, IdentityConfig, SiteConfig};
use yard_patrol_site::services::admin_auth::hash_password;
use yard_patrol_site::state::AppState;

const ADMIN_USERNAME: &str = "operator";
const ADMIN_PASSWORD: &str = "correct horse battery staple";

fn test_app() -> Router {
    let config = SiteConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        identity: IdentityConfig {
            // Nothing listens on the discard port.
            url: Url::parse("http://127.0.0.1:9").unwrap(),
            anon_key: SecretString::from("kX9#mQ2$vL7@pR4!"),
        },
        admin: AdminCredentialsConfig {
            username: ADMIN_USERNAME.to_string(),
            password_hash: SecretString::from(hash_password(ADMIN_PASSWORD).unwrap()),
            api_url: None,
        },
        billing: BillingCatalog::new(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
    };
    yard_patrol_site::app(AppState::new(config).unwrap())
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn form_post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn json_post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// `name=value` part of the session cookie.
fn session_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_health() {
    let response = test_app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_identity_provider() {
    let response = test_app().oneshot(get("/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_home_lists_plans_with_security_headers() {
    let response = test_app().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert!(
        headers
            .get(header::CONTENT_SECURITY_POLICY)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("script-src 'self'")
    );
    assert!(headers.contains_key("x-request-id"));

    let body = body_text(response).await;
    assert!(body.contains("$25.00 / week"));
    assert!(body.contains("Twice Weekly"));
}

#[tokio::test]
async fn test_upstream_request_id_is_echoed() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-42");
}

#[tokio::test]
async fn test_dashboard_redirects_signed_out_visitor() {
    let response = test_app().oneshot(get("/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/signin");
}

#[tokio::test]
async fn test_admin_dashboard_redirects_signed_out_visitor() {
    let response = test_app().oneshot(get("/admin/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/signin");
}

#[tokio::test]
async fn test_content_api_requires_sign_in() {
    let response = test_app()
        .oneshot(get("/api/content/edit-mode"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Sign in required");
}

#[tokio::test]
async fn test_billing_plans_api() {
    let response = test_app()
        .oneshot(get("/api/billing/plans"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["publishable_key"].is_null());
    let plans = json["plans"].as_array().unwrap();
    assert_eq!(plans.len(), 4);
    assert_eq!(plans[0]["id"], "weekly");
    assert_eq!(plans[0]["price_label"], "$25.00 / week");
    assert!(
        plans[0]["stripe_price_id"]
            .as_str()
            .unwrap()
            .starts_with("price_")
    );
}

#[tokio::test]
async fn test_admin_login_api_issues_token_for_me_endpoint() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(json_post(
            "/api/admin/login",
            &serde_json::json!({"username": ADMIN_USERNAME, "password": ADMIN_PASSWORD}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(!token.is_empty());

    let me = Request::builder()
        .uri("/api/admin/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(me).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["metadata"]["role"], "admin");

    let response = app.oneshot(get("/api/admin/me")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_login_api_rejects_wrong_password() {
    let response = test_app()
        .oneshot(json_post(
            "/api/admin/login",
            &serde_json::json!({"username": ADMIN_USERNAME, "password": "nope"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_admin_login_form_requires_both_fields() {
    let response = test_app()
        .oneshot(form_post("/admin/login", "username=&password=", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_text(response).await;
    assert!(body.contains("Username is required"));
    assert!(body.contains("Password is required"));
    assert!(!body.contains("Login Failed"));
}

#[tokio::test]
async fn test_admin_login_form_shows_backend_message() {
    let response = test_app()
        .oneshot(form_post(
            "/admin/login",
            "username=operator&password=wrong",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_text(response).await;
    assert!(body.contains("Login Failed: Invalid credentials"));
    assert!(body.contains("value=\"operator\""));
}

#[tokio::test]
async fn test_admin_login_form_reaches_dashboard_and_content_api() {
    let app = test_app();

    let body = format!("username={ADMIN_USERNAME}&password=correct+horse+battery+staple");
    let response = app
        .clone()
        .oneshot(form_post("/admin/login", &body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/admin/dashboard"
    );
    let cookie = session_cookie(&response);
    assert!(cookie.starts_with("yp_session="));

    let dashboard = Request::builder()
        .uri("/admin/dashboard")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(dashboard).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Admin dashboard"));

    let put = Request::builder()
        .method("PUT")
        .uri("/api/content/overrides/hero-title")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"text":"Clean yards, happy dogs"}"#))
        .unwrap();
    let response = app.clone().oneshot(put).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let home = Request::builder()
        .uri("/")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(home).await.unwrap();
    assert!(body_text(response).await.contains("Clean yards, happy dogs"));

    let bad_id = Request::builder()
        .method("DELETE")
        .uri("/api/content/overrides/not%20valid")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(bad_id).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(form_post("/admin/logout", "", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/admin/login"
    );

    let dashboard = Request::builder()
        .uri("/admin/dashboard")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(dashboard).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

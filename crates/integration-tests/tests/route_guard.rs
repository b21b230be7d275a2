//! Route guard behavior on customer and admin pages.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::{Value, json};

use yard_patrol_integration_tests::{
    ADMIN_PASSWORD, ADMIN_USERNAME, CUSTOMER_EMAIL, CUSTOMER_PASSWORD, STAFF_EMAIL,
    STAFF_PASSWORD, TestSite, location,
};

#[tokio::test]
async fn test_signed_out_visitor_is_sent_to_sign_in() {
    let site = TestSite::spawn().await;

    for path in ["/dashboard", "/admin/dashboard"] {
        let response = site.get(path).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), Some("/signin"), "{path}");
    }
}

#[tokio::test]
async fn test_customer_sees_dashboard_but_not_admin() {
    let site = TestSite::spawn().await;

    let response = site.sign_in(CUSTOMER_EMAIL, CUSTOMER_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/dashboard"));

    let response = site.get("/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Welcome, Pat Doe"));
    assert!(body.contains("555-0100"));

    let response = site.get("/admin/dashboard").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/dashboard"));
}

#[tokio::test]
async fn test_identity_user_with_admin_role_reaches_admin_dashboard() {
    let site = TestSite::spawn().await;

    site.sign_in(STAFF_EMAIL, STAFF_PASSWORD).await;
    let response = site.get("/admin/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("Signed in as Ops Lead"));
}

#[tokio::test]
async fn test_self_assigned_admin_role_is_not_trusted() {
    let site = TestSite::spawn().await;

    // Sign up straight at the provider with the public key, claiming the role.
    let response = site
        .client
        .post(format!("{}/auth/v1/signup", site.identity_url))
        .json(&json!({
            "email": "mallory@example.com",
            "password": "let-me-in-please",
            "data": {"role": "admin", "full_name": "Mallory"},
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = site.sign_in("mallory@example.com", "let-me-in-please").await;
    assert_eq!(location(&response), Some("/dashboard"));

    let response = site.get("/admin/dashboard").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/dashboard"));

    let response = site.get("/api/content/edit-mode").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_content_api_answers_json_to_non_admins() {
    let site = TestSite::spawn().await;

    let response = site.get("/api/content/edit-mode").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    site.sign_in(CUSTOMER_EMAIL, CUSTOMER_PASSWORD).await;
    let response = site.get("/api/content/edit-mode").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Admin access required");
}

#[tokio::test]
async fn test_admin_edits_content_in_own_session() {
    let site = TestSite::spawn().await;
    site.admin_login(ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let response = site.get("/api/content/edit-mode").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<Value>().await.unwrap()["enabled"], false);

    let response = site
        .client
        .put(site.url("/api/content/edit-mode"))
        .json(&json!({"enabled": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = site
        .client
        .put(site.url("/api/content/overrides/hero-subtitle"))
        .json(&json!({"text": "Weekly visits, zero hassle."}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = site.get("/").await.text().await.unwrap();
    assert!(body.contains("Weekly visits, zero hassle."));
    assert!(body.contains("data-editable=\"hero-subtitle\""));
    assert!(body.contains("/static/js/editor.js"));

    let response = site
        .client
        .delete(site.url("/api/content/overrides/hero-subtitle"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = site.get("/api/content/overrides/hero-subtitle").await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["element_id"], "hero-subtitle");
    assert!(body["text"].is_null());

    // Another visitor never sees the edits.
    let other = yard_patrol_integration_tests::client();
    let body = other
        .get(site.url("/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!body.contains("data-editable"));
}

//! End-to-end test harness for Yard Patrol.
//!
//! Every test spawns its own site on `127.0.0.1:0` together with the stub
//! backends it needs, and drives it with a `reqwest` client that keeps
//! cookies and does not follow redirects.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p yard-patrol-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use yard_patrol_core::billing::BillingCatalog;
use yard_patrol_site::config::{AdminCredentialsConfig, IdentityConfig, SiteConfig};
use yard_patrol_site::services::admin_auth::hash_password;
use yard_patrol_site::state::AppState;

/// Operator username configured on every test site.
pub const ADMIN_USERNAME: &str = "operator";
/// Operator password configured on every test site.
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// Customer known to the stub identity provider.
pub const CUSTOMER_EMAIL: &str = "pat@example.com";
/// Password of [`CUSTOMER_EMAIL`].
pub const CUSTOMER_PASSWORD: &str = "mulch-and-leashes";
/// Identity user carrying the admin role.
pub const STAFF_EMAIL: &str = "ops@example.com";
/// Password of [`STAFF_EMAIL`].
pub const STAFF_PASSWORD: &str = "clipboard-and-gloves";

/// Sign-ups to this domain wait for email confirmation.
pub const CONFIRM_DOMAIN: &str = "confirm.test";

/// Token the stub admin API hands out.
pub const STUB_ADMIN_TOKEN: &str = "stub-admin-token";
/// Username the stub admin API refuses without a message.
pub const STUB_LOCKED_USERNAME: &str = "locked";

/// Serve `router` on an ephemeral localhost port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

/// HTTP client that keeps cookies and does not follow redirects.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

// =============================================================================
// Stub identity provider
// =============================================================================

#[derive(Clone)]
struct Account {
    id: String,
    password: String,
    /// Self-service metadata from sign-up.
    metadata: Value,
    /// Provider-controlled metadata; only set by the stub itself.
    app_metadata: Value,
}

#[derive(Default)]
struct IdentityInner {
    accounts: Mutex<HashMap<String, Account>>,
    /// access token -> email
    tokens: Mutex<HashMap<String, String>>,
    next_token: AtomicU32,
    down: AtomicBool,
    logouts: AtomicU32,
}

/// In-memory GoTrue-style identity provider.
#[derive(Clone, Default)]
pub struct StubIdentity {
    inner: Arc<IdentityInner>,
}

impl StubIdentity {
    /// Provider with the customer and staff accounts registered.
    #[must_use]
    pub fn new() -> Self {
        let stub = Self::default();
        stub.add_account(
            CUSTOMER_EMAIL,
            CUSTOMER_PASSWORD,
            json!({"full_name": "Pat Doe", "phone": "555-0100"}),
            json!({"provider": "email"}),
        );
        stub.add_account(
            STAFF_EMAIL,
            STAFF_PASSWORD,
            json!({"full_name": "Ops Lead"}),
            json!({"provider": "email", "role": "admin"}),
        );
        stub
    }

    fn add_account(&self, email: &str, password: &str, metadata: Value, app_metadata: Value) {
        let mut accounts = self.inner.accounts.lock().unwrap();
        let id = format!("user-{}", accounts.len() + 1);
        accounts.insert(
            email.to_string(),
            Account {
                id,
                password: password.to_string(),
                metadata,
                app_metadata,
            },
        );
    }

    /// Make every endpoint answer 503.
    pub fn set_down(&self, down: bool) {
        self.inner.down.store(down, Ordering::SeqCst);
    }

    /// Number of sign-out calls received.
    #[must_use]
    pub fn logouts(&self) -> u32 {
        self.inner.logouts.load(Ordering::SeqCst)
    }

    /// Whether the account exists.
    #[must_use]
    pub fn has_account(&self, email: &str) -> bool {
        self.inner.accounts.lock().unwrap().contains_key(email)
    }

    fn is_down(&self) -> bool {
        self.inner.down.load(Ordering::SeqCst)
    }

    fn issue_token(&self, email: &str) -> String {
        let n = self.inner.next_token.fetch_add(1, Ordering::SeqCst);
        let token = format!("access-{n}");
        self.inner
            .tokens
            .lock()
            .unwrap()
            .insert(token.clone(), email.to_string());
        token
    }

    fn user_json(&self, email: &str) -> Option<Value> {
        let accounts = self.inner.accounts.lock().unwrap();
        let account = accounts.get(email)?;
        Some(json!({
            "id": account.id,
            "email": email,
            "user_metadata": account.metadata,
            "app_metadata": account.app_metadata,
        }))
    }

    fn session_json(&self, email: &str) -> Value {
        let token = self.issue_token(email);
        json!({
            "access_token": token,
            "token_type": "bearer",
            "user": self.user_json(email),
        })
    }

    fn token_email(&self, headers: &HeaderMap) -> Option<String> {
        let token = bearer(headers)?;
        self.inner.tokens.lock().unwrap().get(token).cloned()
    }

    /// Router exposing the `/auth/v1` endpoints.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/auth/v1/health", get(identity_health))
            .route("/auth/v1/user", get(identity_user))
            .route("/auth/v1/token", post(identity_token))
            .route("/auth/v1/signup", post(identity_signup))
            .route("/auth/v1/logout", post(identity_logout))
            .with_state(self.clone())
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"message": "maintenance"})),
    )
        .into_response()
}

async fn identity_health(State(stub): State<StubIdentity>) -> StatusCode {
    if stub.is_down() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

async fn identity_user(State(stub): State<StubIdentity>, headers: HeaderMap) -> Response {
    if stub.is_down() {
        return unavailable();
    }
    match stub
        .token_email(&headers)
        .and_then(|email| stub.user_json(&email))
    {
        Some(user) => Json(user).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "invalid JWT"})),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct PasswordRequest {
    email: String,
    password: String,
    #[serde(default)]
    data: Value,
}

async fn identity_token(
    State(stub): State<StubIdentity>,
    Json(body): Json<PasswordRequest>,
) -> Response {
    if stub.is_down() {
        return unavailable();
    }
    let valid = stub
        .inner
        .accounts
        .lock()
        .unwrap()
        .get(&body.email)
        .is_some_and(|account| account.password == body.password);
    if !valid {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials",
            })),
        )
            .into_response();
    }
    Json(stub.session_json(&body.email)).into_response()
}

async fn identity_signup(
    State(stub): State<StubIdentity>,
    Json(body): Json<PasswordRequest>,
) -> Response {
    if stub.is_down() {
        return unavailable();
    }
    if stub.has_account(&body.email) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"msg": "User already registered"})),
        )
            .into_response();
    }
    let metadata = if body.data.is_null() {
        json!({})
    } else {
        body.data
    };
    stub.add_account(
        &body.email,
        &body.password,
        metadata,
        json!({"provider": "email"}),
    );

    if body.email.ends_with(&format!("@{CONFIRM_DOMAIN}")) {
        Json(stub.user_json(&body.email)).into_response()
    } else {
        Json(stub.session_json(&body.email)).into_response()
    }
}

async fn identity_logout(State(stub): State<StubIdentity>, headers: HeaderMap) -> StatusCode {
    stub.inner.logouts.fetch_add(1, Ordering::SeqCst);
    if let Some(token) = bearer(&headers) {
        stub.inner.tokens.lock().unwrap().remove(token);
    }
    StatusCode::NO_CONTENT
}

// =============================================================================
// Stub remote admin API
// =============================================================================

#[derive(Default)]
struct AdminApiInner {
    logins: AtomicU32,
    me_failing: AtomicBool,
}

/// Remote admin login API with fixed answers.
#[derive(Clone, Default)]
pub struct StubAdminApi {
    inner: Arc<AdminApiInner>,
}

impl StubAdminApi {
    /// Number of login requests received.
    #[must_use]
    pub fn logins(&self) -> u32 {
        self.inner.logins.load(Ordering::SeqCst)
    }

    /// Make `GET /api/admin/me` answer 500.
    pub fn fail_token_checks(&self, failing: bool) {
        self.inner.me_failing.store(failing, Ordering::SeqCst);
    }

    /// Router exposing `/api/admin/login` and `/api/admin/me`.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/admin/login", post(admin_api_login))
            .route("/api/admin/me", get(admin_api_me))
            .with_state(self.clone())
    }
}

#[derive(Deserialize)]
struct AdminLoginRequest {
    username: String,
    password: String,
}

async fn admin_api_login(
    State(stub): State<StubAdminApi>,
    Json(body): Json<AdminLoginRequest>,
) -> Response {
    stub.inner.logins.fetch_add(1, Ordering::SeqCst);
    if body.username == STUB_LOCKED_USERNAME {
        return (StatusCode::FORBIDDEN, Json(json!({}))).into_response();
    }
    if body.username == ADMIN_USERNAME && body.password == ADMIN_PASSWORD {
        Json(json!({"token": STUB_ADMIN_TOKEN})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid credentials"})),
        )
            .into_response()
    }
}

async fn admin_api_me(State(stub): State<StubAdminApi>, headers: HeaderMap) -> Response {
    if stub.inner.me_failing.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if bearer(&headers) == Some(STUB_ADMIN_TOKEN) {
        Json(json!({
            "id": "operator",
            "email": null,
            "metadata": {"role": "admin", "full_name": "Operator"},
        }))
        .into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

// =============================================================================
// Site under test
// =============================================================================

/// A running site plus the client driving it.
pub struct TestSite {
    pub base_url: String,
    pub client: reqwest::Client,
    pub identity: StubIdentity,
    /// Base URL of the stub identity provider, for calls that bypass the site.
    pub identity_url: String,
}

impl TestSite {
    /// Site with an in-process admin login backend.
    pub async fn spawn() -> Self {
        Self::spawn_with_admin_api(None).await
    }

    /// Site whose admin login form talks to `admin_api`.
    pub async fn spawn_with_admin_api(admin_api: Option<Url>) -> Self {
        let identity = StubIdentity::new();
        let identity_addr = serve(identity.router()).await;

        let identity_url = format!("http://{identity_addr}");
        let config = site_config(Url::parse(&identity_url).unwrap(), admin_api);
        let app = yard_patrol_site::app(AppState::new(config).unwrap());
        let addr = serve(app).await;

        Self {
            base_url: format!("http://{addr}"),
            client: client(),
            identity,
            identity_url,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Sign a customer in through the sign-in form.
    pub async fn sign_in(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_form("/signin", &[("email", email), ("password", password)])
            .await
    }

    /// Submit the admin login form.
    pub async fn admin_login(&self, username: &str, password: &str) -> reqwest::Response {
        self.post_form(
            "/admin/login",
            &[("username", username), ("password", password)],
        )
        .await
    }
}

/// `Location` header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> Option<&str> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

fn site_config(identity_url: Url, admin_api: Option<Url>) -> SiteConfig {
    SiteConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        identity: IdentityConfig {
            url: identity_url,
            anon_key: SecretString::from("kX9#mQ2$vL7@pR4!"),
        },
        admin: AdminCredentialsConfig {
            username: ADMIN_USERNAME.to_string(),
            password_hash: SecretString::from(hash_password(ADMIN_PASSWORD).unwrap()),
            api_url: admin_api,
        },
        billing: BillingCatalog::new(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
    }
}

//! Client for the admin login API.
//!
//! The admin login form talks to `POST /api/admin/login` through this client,
//! and session resolution checks stored admin tokens with `GET /api/admin/me`.
//! With `ADMIN_API_URL` set both go over HTTP; otherwise the same backend is
//! called in-process.

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use url::Url;

use yard_patrol_core::UserRecord;
use yard_patrol_core::login::{AdminAuthApi, AdminAuthError, AdminToken, Credentials};

use crate::services::admin_auth::AdminAuthService;
use crate::state::StateError;

/// Path of the login endpoint, relative to the API base URL.
pub const LOGIN_PATH: &str = "/api/admin/login";

/// Path of the token check endpoint, relative to the API base URL.
pub const ME_PATH: &str = "/api/admin/me";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Request body of `POST /api/admin/login`.
#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Success body of `POST /api/admin/login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Failure body of `POST /api/admin/login`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

/// Where admin logins are sent.
#[derive(Clone)]
pub enum AdminApiClient {
    /// A login API on another host.
    Remote {
        http: reqwest::Client,
        login_url: Url,
        me_url: Url,
    },
    /// This process's own login backend.
    InProcess(AdminAuthService),
}

impl AdminApiClient {
    /// Client for a remote login API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URLs cannot be built from `base_url`
    /// or the HTTP client cannot be built.
    pub fn remote(base_url: &Url) -> Result<Self, StateError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::Remote {
            http,
            login_url: base_url.join(LOGIN_PATH)?,
            me_url: base_url.join(ME_PATH)?,
        })
    }

    /// Resolve a stored admin token to the operator it was issued to.
    ///
    /// `Ok(None)` means the token is unknown or revoked.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::Transport` if a remote API cannot be reached.
    pub async fn authorize(&self, token: &str) -> Result<Option<UserRecord>, AdminAuthError> {
        match self {
            Self::InProcess(service) => Ok(service.authorize(token).await),
            Self::Remote { http, me_url, .. } => {
                let response = http
                    .get(me_url.clone())
                    .bearer_auth(token)
                    .send()
                    .await
                    .map_err(|e| AdminAuthError::Transport(e.to_string()))?;
                match response.status() {
                    status if status.is_success() => response
                        .json::<UserRecord>()
                        .await
                        .map(Some)
                        .map_err(|e| AdminAuthError::Transport(e.to_string())),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
                    status => Err(AdminAuthError::Transport(format!(
                        "admin API returned {status}"
                    ))),
                }
            }
        }
    }

    /// Revoke an admin token. Remote tokens are simply forgotten locally.
    pub async fn revoke(&self, token: &str) {
        if let Self::InProcess(service) = self {
            service.revoke(token).await;
        }
    }

    async fn login_remote(
        http: &reqwest::Client,
        login_url: &Url,
        credentials: &Credentials,
    ) -> Result<AdminToken, AdminAuthError> {
        let response = http
            .post(login_url.clone())
            .json(&LoginRequest {
                username: &credentials.username,
                password: credentials.password.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| AdminAuthError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: LoginResponse = response
                .json()
                .await
                .map_err(|e| AdminAuthError::Transport(format!("invalid login response: {e}")))?;
            return Ok(AdminToken::new(body.token));
        }

        let message = response
            .json::<ErrorResponse>()
            .await
            .ok()
            .and_then(|body| body.message);
        tracing::debug!(status = %status, "Admin login API rejected credentials");
        Err(AdminAuthError::Rejected(message))
    }
}

impl AdminAuthApi for AdminApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<AdminToken, AdminAuthError> {
        match self {
            Self::Remote {
                http, login_url, ..
            } => {
                Self::login_remote(http, login_url, credentials).await
            }
            Self::InProcess(service) => service.login(credentials).await,
        }
    }
}

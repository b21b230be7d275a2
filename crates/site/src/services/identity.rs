//! HTTP identity provider client.
//!
//! Talks to a GoTrue-compatible auth service (`/auth/v1/...`). Resolved users
//! are cached per access token for a minute so guarded pages don't hit the
//! provider on every request.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;
use url::Url;

use yard_patrol_core::identity::{IdentityError, IdentityGrant, IdentityProvider, SignUpOutcome};
use yard_patrol_core::{Email, UserMetadata, UserRecord};

use crate::config::IdentityConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_CACHE_TTL: Duration = Duration::from_secs(60);

/// User object returned by the provider.
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    /// Written by the user at sign-up; never trusted for authorization.
    #[serde(default)]
    user_metadata: UserMetadata,
    /// Written only by the provider's service role.
    #[serde(default)]
    app_metadata: AppMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct AppMetadata {
    #[serde(default)]
    role: Option<String>,
}

impl ProviderUser {
    fn into_record(self) -> UserRecord {
        let metadata = UserMetadata {
            role: self.app_metadata.role,
            ..self.user_metadata
        };
        UserRecord {
            id: self.id.into(),
            // Phone-only accounts have no (or an empty) email.
            email: self.email.and_then(|e| Email::parse(&e).ok()),
            metadata,
        }
    }
}

/// Token grant returned by sign-in and auto-confirmed sign-up.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: ProviderUser,
}

/// Sign-up returns either a session or a bare user awaiting confirmation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    Pending {},
}

/// Provider error bodies come in a few shapes depending on the endpoint.
#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ProviderError {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

#[derive(Serialize)]
struct PasswordBody<'a> {
    email: &'a str,
    password: &'a str,
}

/// Identity provider reached over HTTP.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    inner: Arc<HttpIdentityInner>,
}

struct HttpIdentityInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    users: Cache<String, UserRecord>,
}

impl HttpIdentityProvider {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &IdentityConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let users = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(USER_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(HttpIdentityInner {
                client,
                base_url: config.url.clone(),
                anon_key: config.anon_key.clone(),
                users,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| IdentityError::Unavailable(format!("bad identity URL: {e}")))
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .header("apikey", self.inner.anon_key.expose_secret())
    }

    /// Whether the provider answers its health endpoint.
    pub async fn is_healthy(&self) -> bool {
        let Ok(url) = self.endpoint("/auth/v1/health") else {
            return false;
        };
        matches!(
            self.request(reqwest::Method::GET, url).send().await,
            Ok(response) if response.status().is_success()
        )
    }
}

fn unavailable(err: &reqwest::Error) -> IdentityError {
    IdentityError::Unavailable(err.to_string())
}

/// Turn a non-success response into an `IdentityError`.
async fn error_from_response(response: reqwest::Response) -> IdentityError {
    let status = response.status();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return IdentityError::Unavailable(format!("identity provider returned {status}"));
    }
    let message = response
        .json::<ProviderError>()
        .await
        .unwrap_or_default()
        .into_message();
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED
            if message
                .as_deref()
                .is_some_and(|m| m.to_ascii_lowercase().contains("invalid login")) =>
        {
            IdentityError::InvalidCredentials
        }
        StatusCode::UNAUTHORIZED => IdentityError::InvalidCredentials,
        _ => IdentityError::Rejected(message.unwrap_or_else(|| format!("request failed ({status})"))),
    }
}

impl IdentityProvider for HttpIdentityProvider {
    #[instrument(skip_all)]
    async fn current_user(&self, access_token: &str) -> Result<Option<UserRecord>, IdentityError> {
        if let Some(user) = self.inner.users.get(access_token).await {
            return Ok(Some(user));
        }

        let response = self
            .request(reqwest::Method::GET, self.endpoint("/auth/v1/user")?)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| unavailable(&e))?;

        match response.status() {
            status if status.is_success() => {
                let user = response
                    .json::<ProviderUser>()
                    .await
                    .map_err(|e| unavailable(&e))?
                    .into_record();
                self.inner
                    .users
                    .insert(access_token.to_string(), user.clone())
                    .await;
                Ok(Some(user))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            _ => Err(error_from_response(response).await),
        }
    }

    #[instrument(skip_all)]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<IdentityGrant, IdentityError> {
        let mut url = self.endpoint("/auth/v1/token")?;
        url.set_query(Some("grant_type=password"));

        let response = self
            .request(reqwest::Method::POST, url)
            .json(&PasswordBody {
                email: email.as_str(),
                password: password.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| unavailable(&e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: TokenResponse = response.json().await.map_err(|e| unavailable(&e))?;
        let user = body.user.into_record();
        self.inner
            .users
            .insert(body.access_token.clone(), user.clone())
            .await;

        Ok(IdentityGrant {
            access_token: SecretString::from(body.access_token),
            user,
        })
    }

    #[instrument(skip_all)]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        metadata: UserMetadata,
    ) -> Result<SignUpOutcome, IdentityError> {
        let response = self
            .request(reqwest::Method::POST, self.endpoint("/auth/v1/signup")?)
            .json(&json!({
                "email": email.as_str(),
                "password": password.expose_secret(),
                "data": metadata,
            }))
            .send()
            .await
            .map_err(|e| unavailable(&e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        match response.json::<SignUpResponse>().await.map_err(|e| unavailable(&e))? {
            SignUpResponse::Session(body) => {
                let user = body.user.into_record();
                Ok(SignUpOutcome::SignedIn(IdentityGrant {
                    access_token: SecretString::from(body.access_token),
                    user,
                }))
            }
            SignUpResponse::Pending {} => Ok(SignUpOutcome::ConfirmationRequired),
        }
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        self.inner.users.invalidate(access_token).await;

        let response = self
            .request(reqwest::Method::POST, self.endpoint("/auth/v1/logout")?)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| unavailable(&e))?;

        // An already-expired token is as signed out as it gets.
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

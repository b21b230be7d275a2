//! Application state shared across handlers.

use std::sync::Arc;

use thiserror::Error;

use crate::config::SiteConfig;
use crate::services::{AdminApiClient, AdminAuthService, HttpIdentityProvider};

/// Error building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid ADMIN_API_URL: {0}")]
    AdminApiUrl(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the configuration and the backends every request may touch.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    identity: HttpIdentityProvider,
    admin_auth: AdminAuthService,
    admin_api: AdminApiClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin API URL cannot be turned into endpoints.
    pub fn new(config: SiteConfig) -> Result<Self, StateError> {
        let identity = HttpIdentityProvider::new(&config.identity)?;
        let admin_auth = AdminAuthService::new(&config.admin);
        let admin_api = match &config.admin.api_url {
            Some(url) => {
                tracing::info!(url = %url, "Admin logins go to remote API");
                AdminApiClient::remote(url)?
            }
            None => AdminApiClient::InProcess(admin_auth.clone()),
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                admin_auth,
                admin_api,
            }),
        })
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Get a reference to the identity provider client.
    #[must_use]
    pub fn identity(&self) -> &HttpIdentityProvider {
        &self.inner.identity
    }

    /// Get a reference to the local admin login backend.
    ///
    /// This always serves `/api/admin/login`, even when the admin login
    /// form is pointed at a remote API.
    #[must_use]
    pub fn admin_auth(&self) -> &AdminAuthService {
        &self.inner.admin_auth
    }

    /// Get a reference to the client the admin login form uses.
    #[must_use]
    pub fn admin_api(&self) -> &AdminApiClient {
        &self.inner.admin_api
    }
}

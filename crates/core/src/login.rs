//! Admin login flow.
//!
//! ```text
//! Idle ──submit──▶ Submitting ──ok──▶ Redirected
//!   ▲                  │
//!   └──── error ◀──────┘
//! ```
//!
//! Validation happens locally and never reaches the network. A valid submit
//! makes exactly one [`AdminAuthApi::login`] call. On success the token is
//! written under [`keys::ADMIN_TOKEN`] and the flow navigates to the admin
//! dashboard once; on failure the banner reads `Login Failed: <message>` and
//! the store is left alone.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use secrecy::SecretString;
use serde::Deserialize;

use crate::navigator::{Navigator, routes};
use crate::store::{SessionStore, keys};

/// Banner text used when the backend gives no usable message.
pub const GENERIC_FAILURE: &str = "An unexpected error occurred";

const USERNAME_REQUIRED: &str = "Username is required";
const PASSWORD_REQUIRED: &str = "Password is required";

/// Raw admin login form input.
#[derive(Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl LoginForm {
    /// Check both fields are non-empty.
    ///
    /// # Errors
    ///
    /// Returns per-field messages for every empty field.
    pub fn validate(&self) -> Result<Credentials, FieldErrors> {
        let errors = FieldErrors {
            username: self.username.is_empty().then_some(USERNAME_REQUIRED),
            password: self.password.is_empty().then_some(PASSWORD_REQUIRED),
        };
        if errors.is_empty() {
            Ok(Credentials {
                username: self.username.clone(),
                password: SecretString::from(self.password.clone()),
            })
        } else {
            Err(errors)
        }
    }
}

/// Inline validation messages, one per field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub username: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl FieldErrors {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

/// Validated login credentials. Never persisted.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Opaque admin token returned by the login backend.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminToken(String);

impl AdminToken {
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for AdminToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminToken([REDACTED])")
    }
}

/// Failure reported by the login backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminAuthError {
    /// Non-2xx response, with the `message` field when the body had one.
    #[error("login rejected: {}", .0.as_deref().unwrap_or("no message"))]
    Rejected(Option<String>),

    /// The request never produced a response.
    #[error("login request failed: {0}")]
    Transport(String),
}

impl AdminAuthError {
    /// Message to show after `Login Failed: `.
    #[must_use]
    pub fn display_message(&self) -> &str {
        match self {
            Self::Rejected(Some(message)) if !message.trim().is_empty() => message,
            Self::Rejected(_) | Self::Transport(_) => GENERIC_FAILURE,
        }
    }
}

/// Backend behind `POST /api/admin/login`.
pub trait AdminAuthApi: Send + Sync {
    /// Exchange credentials for a token. Called once per valid submit.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AdminToken, AdminAuthError>> + Send;
}

impl<A: AdminAuthApi> AdminAuthApi for &A {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AdminToken, AdminAuthError>> + Send {
        (**self).login(credentials)
    }
}

/// Where the flow currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    /// Waiting for input, optionally showing the last failure banner.
    Idle { error: Option<String> },
    /// A login request is outstanding; the submit control is disabled.
    Submitting,
    /// Token stored and navigation issued.
    Redirected,
}

impl Default for LoginState {
    fn default() -> Self {
        Self::Idle { error: None }
    }
}

impl LoginState {
    /// Whether the submit control should be disabled.
    #[must_use]
    pub const fn submit_disabled(&self) -> bool {
        matches!(self, Self::Submitting | Self::Redirected)
    }

    /// Banner text, if the last attempt failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Idle { error } => error.as_deref(),
            Self::Submitting | Self::Redirected => None,
        }
    }
}

/// Result of one call to [`AdminLoginFlow::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Local validation failed; nothing was sent.
    Invalid(FieldErrors),
    /// The backend refused or could not be reached. Holds the banner text.
    Failed(String),
    /// Token stored, navigated to the admin dashboard.
    Redirected,
    /// Another submit is still outstanding.
    Busy,
    /// This flow already completed a login.
    AlreadyRedirected,
}

/// Admin login form controller.
pub struct AdminLoginFlow<A, S, N> {
    api: A,
    store: S,
    navigator: N,
    state: Mutex<LoginState>,
}

impl<A, S, N> fmt::Debug for AdminLoginFlow<A, S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminLoginFlow")
            .field("state", &*lock(&self.state))
            .finish_non_exhaustive()
    }
}

impl<A, S, N> AdminLoginFlow<A, S, N>
where
    A: AdminAuthApi,
    S: SessionStore,
    N: Navigator,
{
    pub fn new(api: A, store: S, navigator: N) -> Self {
        Self {
            api,
            store,
            navigator,
            state: Mutex::new(LoginState::default()),
        }
    }

    /// Current state.
    pub fn state(&self) -> LoginState {
        lock(&self.state).clone()
    }

    /// Validate and submit the form.
    ///
    /// If the returned future is dropped before it completes, the flow goes
    /// back to `Idle` and nothing is stored.
    pub async fn submit(&self, form: &LoginForm) -> LoginOutcome {
        let credentials = match self.begin(form) {
            Ok(credentials) => credentials,
            Err(outcome) => return outcome,
        };

        let mut pending = PendingSubmit {
            state: &self.state,
            settled: false,
        };
        let outcome = self.exchange(&credentials).await;
        pending.settle(match &outcome {
            Ok(()) => LoginState::Redirected,
            Err(banner) => LoginState::Idle {
                error: Some(banner.clone()),
            },
        });

        match outcome {
            Ok(()) => {
                self.navigator.navigate(routes::ADMIN_DASHBOARD);
                LoginOutcome::Redirected
            }
            Err(banner) => LoginOutcome::Failed(banner),
        }
    }

    /// Move `Idle` to `Submitting` if the form is valid.
    fn begin(&self, form: &LoginForm) -> Result<Credentials, LoginOutcome> {
        let mut state = lock(&self.state);
        match *state {
            LoginState::Submitting => return Err(LoginOutcome::Busy),
            LoginState::Redirected => return Err(LoginOutcome::AlreadyRedirected),
            LoginState::Idle { .. } => {}
        }
        match form.validate() {
            Ok(credentials) => {
                *state = LoginState::Submitting;
                Ok(credentials)
            }
            Err(errors) => {
                *state = LoginState::Idle { error: None };
                Err(LoginOutcome::Invalid(errors))
            }
        }
    }

    async fn exchange(&self, credentials: &Credentials) -> Result<(), String> {
        let token = self
            .api
            .login(credentials)
            .await
            .map_err(|e| format!("Login Failed: {}", e.display_message()))?;

        self.store
            .set(keys::ADMIN_TOKEN, token.into_inner())
            .await
            .map_err(|_| format!("Login Failed: {GENERIC_FAILURE}"))
    }
}

fn lock(state: &Mutex<LoginState>) -> MutexGuard<'_, LoginState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returns the flow to `Idle` if a submit is abandoned mid-flight.
struct PendingSubmit<'a> {
    state: &'a Mutex<LoginState>,
    settled: bool,
}

impl PendingSubmit<'_> {
    fn settle(&mut self, next: LoginState) {
        *lock(self.state) = next;
        self.settled = true;
    }
}

impl Drop for PendingSubmit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            *lock(self.state) = LoginState::default();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use secrecy::ExposeSecret;
    use tokio::sync::Notify;

    use super::*;
    use crate::store::MemoryStore;

    #[derive(Debug, Default)]
    struct RecordingNavigator {
        visits: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, to: &str) {
            self.visits.lock().unwrap().push(to.to_owned());
        }
    }

    impl RecordingNavigator {
        fn visits(&self) -> Vec<String> {
            self.visits.lock().unwrap().clone()
        }
    }

    /// Backend that answers every call with the same result.
    struct StubApi {
        result: Result<AdminToken, AdminAuthError>,
        calls: AtomicUsize,
        gate: Option<Notify>,
    }

    impl StubApi {
        fn returning(result: Result<AdminToken, AdminAuthError>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn gated(result: Result<AdminToken, AdminAuthError>) -> Self {
            Self {
                gate: Some(Notify::new()),
                ..Self::returning(result)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AdminAuthApi for StubApi {
        async fn login(&self, credentials: &Credentials) -> Result<AdminToken, AdminAuthError> {
            assert!(!credentials.password.expose_secret().is_empty());
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.result.clone()
        }
    }

    fn form(username: &str, password: &str) -> LoginForm {
        LoginForm {
            username: username.to_owned(),
            password: password.to_owned(),
        }
    }

    #[test]
    fn test_validate_reports_each_empty_field() {
        let errors = form("", "").validate().unwrap_err();
        assert_eq!(errors.username, Some("Username is required"));
        assert_eq!(errors.password, Some("Password is required"));

        let errors = form("admin", "").validate().unwrap_err();
        assert_eq!(errors.username, None);
        assert_eq!(errors.password, Some("Password is required"));

        let credentials = form("admin", "hunter2").validate().unwrap();
        assert_eq!(credentials.username, "admin");
        assert_eq!(credentials.password.expose_secret(), "hunter2");
    }

    #[test]
    fn test_form_debug_redacts_password() {
        let debug = format!("{:?}", form("admin", "hunter2"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_invalid_form_makes_no_request() {
        let api = StubApi::returning(Ok(AdminToken::new("abc123".to_owned())));
        let store = MemoryStore::new();
        let navigator = RecordingNavigator::default();
        let flow = AdminLoginFlow::new(&api, &store, &navigator);

        let outcome = flow.submit(&form("admin", "")).await;
        assert!(matches!(outcome, LoginOutcome::Invalid(_)));
        assert_eq!(api.calls(), 0);
        assert_eq!(flow.state(), LoginState::Idle { error: None });
        assert!(navigator.visits().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_login_shows_server_message() {
        let api = StubApi::returning(Err(AdminAuthError::Rejected(Some(
            "Invalid credentials".to_owned(),
        ))));
        let store = MemoryStore::new();
        let navigator = RecordingNavigator::default();
        let flow = AdminLoginFlow::new(&api, &store, &navigator);

        let outcome = flow.submit(&form("admin", "wrongpass")).await;
        assert_eq!(
            outcome,
            LoginOutcome::Failed("Login Failed: Invalid credentials".to_owned())
        );
        assert_eq!(flow.state().error(), Some("Login Failed: Invalid credentials"));
        assert!(!flow.state().submit_disabled());
        assert_eq!(store.get(keys::ADMIN_TOKEN).await.unwrap(), None);
        assert!(navigator.visits().is_empty());
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_uses_generic_banner() {
        let api = StubApi::returning(Err(AdminAuthError::Transport(
            "connection refused".to_owned(),
        )));
        let store = MemoryStore::new();
        let navigator = RecordingNavigator::default();
        let flow = AdminLoginFlow::new(&api, &store, &navigator);

        let outcome = flow.submit(&form("admin", "pw")).await;
        assert_eq!(
            outcome,
            LoginOutcome::Failed("Login Failed: An unexpected error occurred".to_owned())
        );
        assert_eq!(store.get(keys::ADMIN_TOKEN).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failure_keeps_existing_token() {
        let api = StubApi::returning(Err(AdminAuthError::Rejected(None)));
        let store = MemoryStore::new();
        store
            .set(keys::ADMIN_TOKEN, "previous".to_owned())
            .await
            .unwrap();
        let navigator = RecordingNavigator::default();
        let flow = AdminLoginFlow::new(&api, &store, &navigator);

        flow.submit(&form("admin", "pw")).await;
        assert_eq!(
            store.get(keys::ADMIN_TOKEN).await.unwrap().as_deref(),
            Some("previous")
        );
    }

    #[tokio::test]
    async fn test_success_stores_token_and_navigates_once() {
        let api = StubApi::returning(Ok(AdminToken::new("abc123".to_owned())));
        let store = MemoryStore::new();
        let navigator = RecordingNavigator::default();
        let flow = AdminLoginFlow::new(&api, &store, &navigator);

        assert_eq!(
            flow.submit(&form("admin", "correct")).await,
            LoginOutcome::Redirected
        );
        assert_eq!(
            store.get(keys::ADMIN_TOKEN).await.unwrap().as_deref(),
            Some("abc123")
        );
        assert_eq!(navigator.visits(), vec!["/admin/dashboard"]);
        assert_eq!(flow.state(), LoginState::Redirected);

        assert_eq!(
            flow.submit(&form("admin", "correct")).await,
            LoginOutcome::AlreadyRedirected
        );
        assert_eq!(navigator.visits().len(), 1);
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_after_failure_is_allowed() {
        let failing = StubApi::returning(Err(AdminAuthError::Rejected(None)));
        let store = MemoryStore::new();
        let navigator = RecordingNavigator::default();
        let flow = AdminLoginFlow::new(&failing, &store, &navigator);

        assert!(matches!(
            flow.submit(&form("admin", "pw")).await,
            LoginOutcome::Failed(_)
        ));
        assert!(matches!(
            flow.submit(&form("admin", "pw")).await,
            LoginOutcome::Failed(_)
        ));
        assert_eq!(failing.calls(), 2);
    }

    #[tokio::test]
    async fn test_second_submit_while_outstanding_is_refused() {
        let api = StubApi::gated(Ok(AdminToken::new("abc123".to_owned())));
        let store = MemoryStore::new();
        let navigator = RecordingNavigator::default();
        let flow = AdminLoginFlow::new(&api, &store, &navigator);
        let credentials = form("admin", "correct");

        let (first, second, ()) = tokio::join!(
            flow.submit(&credentials),
            async {
                tokio::task::yield_now().await;
                assert!(flow.state().submit_disabled());
                flow.submit(&credentials).await
            },
            async {
                tokio::task::yield_now().await;
                tokio::task::yield_now().await;
                if let Some(gate) = &api.gate {
                    gate.notify_one();
                }
            },
        );

        assert_eq!(first, LoginOutcome::Redirected);
        assert_eq!(second, LoginOutcome::Busy);
        assert_eq!(api.calls(), 1);
        assert_eq!(navigator.visits(), vec!["/admin/dashboard"]);
    }

    #[tokio::test]
    async fn test_abandoned_submit_returns_to_idle() {
        let api = StubApi::gated(Ok(AdminToken::new("abc123".to_owned())));
        let store = MemoryStore::new();
        let navigator = RecordingNavigator::default();
        let flow = AdminLoginFlow::new(&api, &store, &navigator);

        {
            let login_form = form("admin", "correct");
            let submit = flow.submit(&login_form);
            tokio::pin!(submit);
            assert!(
                tokio::time::timeout(std::time::Duration::from_millis(10), &mut submit)
                    .await
                    .is_err()
            );
            assert_eq!(flow.state(), LoginState::Submitting);
        }

        assert_eq!(flow.state(), LoginState::Idle { error: None });
        assert_eq!(store.get(keys::ADMIN_TOKEN).await.unwrap(), None);
        assert!(navigator.visits().is_empty());
    }
}

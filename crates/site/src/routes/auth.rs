//! Customer sign-in, sign-up and sign-out.
//!
//! Passwords go straight to the identity provider. Only the access token it
//! hands back is kept, in the visitor session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use yard_patrol_core::identity::{IdentityError, IdentityGrant, IdentityProvider, SignUpOutcome};
use yard_patrol_core::navigator::routes;
use yard_patrol_core::{Email, SessionStore, UserMetadata};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::CurrentSession;
use crate::models::{NavUser, session_keys};
use crate::services::TowerSessionStore;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Sign-up form data.
#[derive(Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Sign-in page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signin.html")]
pub struct SignInTemplate {
    pub nav: Option<NavUser>,
    pub error: Option<String>,
    pub email: String,
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignUpTemplate {
    pub nav: Option<NavUser>,
    pub error: Option<String>,
    pub email: String,
    pub full_name: String,
    pub phone: String,
}

/// Shown when the provider wants the address confirmed first.
#[derive(Template, WebTemplate)]
#[template(path = "auth/check_email.html")]
pub struct CheckEmailTemplate {
    pub nav: Option<NavUser>,
    pub email: String,
}

// =============================================================================
// Sign In
// =============================================================================

/// Display the sign-in page.
pub async fn sign_in_page(current: CurrentSession) -> impl IntoResponse {
    SignInTemplate {
        nav: current.nav(),
        error: None,
        email: String::new(),
    }
}

/// Handle sign-in form submission.
#[instrument(skip_all)]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> Response {
    let page = |status: StatusCode, error: String| {
        (
            status,
            SignInTemplate {
                nav: None,
                error: Some(error),
                email: form.email.clone(),
            },
        )
            .into_response()
    };

    let Ok(email) = Email::parse(&form.email) else {
        return page(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Enter a valid email address".to_string(),
        );
    };
    if form.password.is_empty() {
        return page(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Password is required".to_string(),
        );
    }

    let password = SecretString::from(form.password.clone());
    match state.identity().sign_in(&email, &password).await {
        Ok(grant) => match start_session(&session, &grant).await {
            Ok(()) => Redirect::to(routes::NON_ADMIN_LANDING).into_response(),
            Err(status) => page(status, SESSION_FAILURE.to_string()),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Sign-in failed");
            let (status, message) = identity_failure(&e);
            page(status, message)
        }
    }
}

// =============================================================================
// Sign Up
// =============================================================================

/// Display the sign-up page.
pub async fn sign_up_page(current: CurrentSession) -> impl IntoResponse {
    SignUpTemplate {
        nav: current.nav(),
        error: None,
        email: String::new(),
        full_name: String::new(),
        phone: String::new(),
    }
}

/// Handle sign-up form submission.
#[instrument(skip_all)]
pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignUpForm>,
) -> Response {
    let full_name = non_blank(form.full_name.as_deref());
    let phone = non_blank(form.phone.as_deref());
    let page = |status: StatusCode, error: String| {
        (
            status,
            SignUpTemplate {
                nav: None,
                error: Some(error),
                email: form.email.clone(),
                full_name: full_name.clone().unwrap_or_default(),
                phone: phone.clone().unwrap_or_default(),
            },
        )
            .into_response()
    };

    let Ok(email) = Email::parse(&form.email) else {
        return page(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Enter a valid email address".to_string(),
        );
    };
    if form.password.is_empty() {
        return page(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Password is required".to_string(),
        );
    }
    if form.password != form.password_confirm {
        return page(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Passwords do not match".to_string(),
        );
    }

    let metadata = UserMetadata {
        full_name: full_name.clone(),
        phone: phone.clone(),
        ..UserMetadata::default()
    };
    let password = SecretString::from(form.password.clone());

    match state.identity().sign_up(&email, &password, metadata).await {
        Ok(SignUpOutcome::SignedIn(grant)) => match start_session(&session, &grant).await {
            Ok(()) => Redirect::to(routes::NON_ADMIN_LANDING).into_response(),
            Err(status) => page(status, SESSION_FAILURE.to_string()),
        },
        Ok(SignUpOutcome::ConfirmationRequired) => {
            tracing::info!(domain = %email.domain(), "Sign-up awaiting email confirmation");
            CheckEmailTemplate {
                nav: None,
                email: email.as_str().to_string(),
            }
            .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Sign-up failed");
            let (status, message) = identity_failure(&e);
            page(status, message)
        }
    }
}

// =============================================================================
// Sign Out
// =============================================================================

/// Sign out of the identity provider and forget the session.
#[instrument(skip_all)]
pub async fn sign_out(State(state): State<AppState>, session: Session) -> Redirect {
    let store = TowerSessionStore::new(session);

    match store.get(session_keys::IDENTITY_TOKEN).await {
        Ok(Some(token)) => {
            if let Err(e) = state.identity().sign_out(&token).await {
                tracing::warn!(error = %e, "Identity provider sign-out failed");
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to read identity token"),
    }

    if let Err(e) = store.remove(session_keys::IDENTITY_TOKEN).await {
        tracing::error!(error = %e, "Failed to remove identity token");
    }

    // Flushing only forgets the admin token locally; revoke it in the registry.
    match store.get(session_keys::ADMIN_TOKEN).await {
        Ok(Some(token)) => state.admin_api().revoke(&token).await,
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to read admin token"),
    }

    if let Err(e) = store.flush().await {
        tracing::error!(error = %e, "Failed to flush session");
    }
    clear_sentry_user();

    Redirect::to("/")
}

// =============================================================================
// Helpers
// =============================================================================

const SESSION_FAILURE: &str = "Could not start your session. Please try again.";

/// Store the access token under a fresh session ID.
async fn start_session(session: &Session, grant: &IdentityGrant) -> Result<(), StatusCode> {
    if let Err(e) = session.cycle_id().await {
        tracing::error!(error = %e, "Failed to cycle session id");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let store = TowerSessionStore::new(session.clone());
    if let Err(e) = store
        .set(
            session_keys::IDENTITY_TOKEN,
            grant.access_token.expose_secret().to_string(),
        )
        .await
    {
        tracing::error!(error = %e, "Failed to store identity token");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    set_sentry_user(
        &grant.user.id,
        grant.user.email.as_ref().map(Email::as_str),
    );
    tracing::info!(user_id = %grant.user.id, "Customer signed in");
    Ok(())
}

/// Status and message shown for a provider failure.
fn identity_failure(err: &IdentityError) -> (StatusCode, String) {
    match err {
        IdentityError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        ),
        IdentityError::Rejected(message) => (StatusCode::BAD_REQUEST, message.clone()),
        IdentityError::Unavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "We could not reach the sign-in service. Please try again shortly.".to_string(),
        ),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use tower_sessions::MemoryStore;
    use url::Url;

    use super::*;
    use crate::config::{AdminCredentialsConfig, IdentityConfig, SiteConfig};
    use crate::services::admin_auth::hash_password;
    use yard_patrol_core::billing::BillingCatalog;

    #[test]
    fn test_identity_failure_messages() {
        let (status, message) = identity_failure(&IdentityError::InvalidCredentials);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message, "Invalid email or password");

        let (status, message) =
            identity_failure(&IdentityError::Rejected("User already registered".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "User already registered");

        let (status, _) = identity_failure(&IdentityError::Unavailable("timeout".to_string()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    fn state() -> AppState {
        AppState::new(SiteConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            identity: IdentityConfig {
                url: Url::parse("http://127.0.0.1:9").unwrap(),
                anon_key: SecretString::from("kX9#mQ2$vL7@pR4!"),
            },
            admin: AdminCredentialsConfig {
                username: "operator".to_string(),
                password_hash: SecretString::from(hash_password("pw").unwrap()),
                api_url: None,
            },
            billing: BillingCatalog::new(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_sign_out_revokes_admin_token() {
        let state = state();
        let token = state
            .admin_auth()
            .issue_token("operator", &SecretString::from("pw"))
            .await
            .unwrap()
            .into_inner();

        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        TowerSessionStore::new(session.clone())
            .set(session_keys::ADMIN_TOKEN, token.clone())
            .await
            .unwrap();
        assert!(state.admin_auth().authorize(&token).await.is_some());

        let redirect = sign_out(State(state.clone()), session.clone()).await;
        assert_eq!(
            redirect
                .into_response()
                .headers()
                .get(axum::http::header::LOCATION)
                .unwrap(),
            "/"
        );
        assert!(state.admin_auth().authorize(&token).await.is_none());
        assert_eq!(
            TowerSessionStore::new(session)
                .get(session_keys::ADMIN_TOKEN)
                .await
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_non_blank_trims() {
        assert_eq!(non_blank(Some("  Pat  ")), Some("Pat".to_string()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}

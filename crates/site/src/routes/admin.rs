//! Admin portal pages.
//!
//! The login form runs the core [`AdminLoginFlow`] against the configured
//! admin API and this request's session. A successful submit stores the token
//! and redirects to the admin dashboard; anything else re-renders the form.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use yard_patrol_core::billing::Plan;
use yard_patrol_core::content::ContentEditor;
use yard_patrol_core::login::{AdminLoginFlow, FieldErrors, LoginForm, LoginOutcome};
use yard_patrol_core::navigator::routes;
use yard_patrol_core::{SessionStore, UserRecord};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CurrentSession, RequireAdmin};
use crate::models::{NavUser, session_keys};
use crate::navigation::RedirectSlot;
use crate::services::TowerSessionStore;
use crate::state::AppState;

/// Admin login page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct AdminLoginTemplate {
    pub nav: Option<NavUser>,
    pub username: String,
    pub username_error: Option<&'static str>,
    pub password_error: Option<&'static str>,
    /// `Login Failed: ...` banner.
    pub banner: Option<String>,
}

impl AdminLoginTemplate {
    fn blank(nav: Option<NavUser>) -> Self {
        Self {
            nav,
            username: String::new(),
            username_error: None,
            password_error: None,
            banner: None,
        }
    }
}

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub nav: Option<NavUser>,
    pub operator: UserRecord,
    pub edit_mode: bool,
    pub plans: Vec<Plan>,
    /// `test`, `live`, or `None` when no publishable key is configured.
    pub stripe_mode: Option<&'static str>,
}

/// Display the admin login form.
pub async fn login_page(current: CurrentSession) -> impl IntoResponse {
    AdminLoginTemplate::blank(current.nav())
}

/// Handle admin login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let slot = RedirectSlot::default();
    let flow = AdminLoginFlow::new(
        state.admin_api(),
        TowerSessionStore::new(session.clone()),
        &slot,
    );

    match flow.submit(&form).await {
        LoginOutcome::Redirected => {
            if let Err(e) = session.cycle_id().await {
                tracing::warn!(error = %e, "Failed to cycle session id after admin login");
            }
            let operator = UserRecord::operator();
            set_sentry_user(&operator.id, None);
            tracing::info!("Admin signed in");
            slot.redirect()
                .unwrap_or_else(|| Redirect::to(routes::ADMIN_DASHBOARD))
                .into_response()
        }
        LoginOutcome::Invalid(errors) => {
            render_form(StatusCode::UNPROCESSABLE_ENTITY, &form, &errors, None)
        }
        LoginOutcome::Failed(banner) => render_form(
            StatusCode::UNAUTHORIZED,
            &form,
            &FieldErrors::default(),
            Some(banner),
        ),
        LoginOutcome::Busy | LoginOutcome::AlreadyRedirected => {
            Redirect::to(routes::ADMIN_LOGIN).into_response()
        }
    }
}

fn render_form(
    status: StatusCode,
    form: &LoginForm,
    errors: &FieldErrors,
    banner: Option<String>,
) -> Response {
    (
        status,
        AdminLoginTemplate {
            nav: None,
            username: form.username.clone(),
            username_error: errors.username,
            password_error: errors.password,
            banner,
        },
    )
        .into_response()
}

/// Display the admin dashboard.
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(operator): RequireAdmin,
    session: Session,
) -> impl IntoResponse {
    let editor = ContentEditor::new(TowerSessionStore::new(session));
    let edit_mode = editor.edit_mode().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read edit mode");
        false
    });

    let billing = &state.config().billing;
    AdminDashboardTemplate {
        nav: Some(NavUser::from(&operator)),
        operator,
        edit_mode,
        plans: billing.plans().to_vec(),
        stripe_mode: billing
            .publishable_key()
            .map(|key| if key.is_test_mode() { "test" } else { "live" }),
    }
}

/// Remove the admin token and revoke it.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Redirect {
    let store = TowerSessionStore::new(session);

    match store.get(session_keys::ADMIN_TOKEN).await {
        Ok(Some(token)) => state.admin_api().revoke(&token).await,
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to read admin token"),
    }
    if let Err(e) = store.remove(session_keys::ADMIN_TOKEN).await {
        tracing::error!(error = %e, "Failed to remove admin token");
    }
    clear_sentry_user();

    Redirect::to(routes::ADMIN_LOGIN)
}

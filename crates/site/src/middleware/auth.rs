//! Route guard extractors.
//!
//! Resolves the visitor's session once per request and runs it through the
//! core [`RouteGuard`]. Protected handlers take [`RequireUser`] or
//! [`RequireAdmin`]; pages that only adapt to the visitor take
//! [`CurrentSession`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderName, HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use yard_patrol_core::{GuardView, RouteGuard, Session as ResolvedSession, UserRecord};

use crate::error::ErrorBody;
use crate::filters;
use crate::models::NavUser;
use crate::navigation::RedirectSlot;
use crate::services::{TowerSessionStore, resolve_session};
use crate::state::AppState;

/// Seconds the loading page waits before trying again.
const LOADING_RETRY_SECONDS: u64 = 2;

/// Shown while the session cannot be resolved yet.
#[derive(Template, WebTemplate)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {
    pub nav: Option<NavUser>,
    pub retry_seconds: u64,
}

/// The visitor's resolved session, cached in request extensions.
#[derive(Clone, Debug)]
pub struct CurrentSession(pub ResolvedSession);

impl CurrentSession {
    /// Header navigation for templates.
    #[must_use]
    pub fn nav(&self) -> Option<NavUser> {
        self.0.user().map(NavUser::from)
    }
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(cached) = parts.extensions.get::<Self>() {
            return Ok(cached.clone());
        }

        let resolved = match parts.extensions.get::<Session>() {
            Some(session) => {
                let store = TowerSessionStore::new(session.clone());
                resolve_session(&store, state.admin_api(), state.identity()).await
            }
            None => {
                tracing::warn!("Session not found in request extensions - layer may be missing");
                ResolvedSession::signed_out()
            }
        };

        let current = Self(resolved);
        parts.extensions.insert(current.clone());
        Ok(current)
    }
}

/// Extractor for views any signed-in visitor may see.
pub struct RequireUser(pub UserRecord);

/// Extractor for views that require the admin role.
pub struct RequireAdmin(pub UserRecord);

/// Why a guarded request did not reach its handler.
#[derive(Debug)]
pub enum GuardRejection {
    /// Session still loading (HTML): loading page that refreshes itself.
    Loading,
    /// Session still loading (API).
    LoadingApi,
    /// Redirect issued by the guard (HTML).
    Redirect(String),
    /// Not signed in (API).
    Unauthorized,
    /// Signed in without the admin role (API).
    Forbidden,
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Loading => {
                let page = LoadingTemplate {
                    nav: None,
                    retry_seconds: LOADING_RETRY_SECONDS,
                };
                let mut response = (StatusCode::SERVICE_UNAVAILABLE, page).into_response();
                let retry = HeaderValue::from(LOADING_RETRY_SECONDS);
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, retry.clone());
                response
                    .headers_mut()
                    .insert(HeaderName::from_static("refresh"), retry);
                response
            }
            Self::LoadingApi => json_rejection(StatusCode::SERVICE_UNAVAILABLE, "Session is loading"),
            Self::Redirect(to) => axum::response::Redirect::to(&to).into_response(),
            Self::Unauthorized => json_rejection(StatusCode::UNAUTHORIZED, "Sign in required"),
            Self::Forbidden => json_rejection(StatusCode::FORBIDDEN, "Admin access required"),
        }
    }
}

fn json_rejection(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Run the route guard for this request.
async fn guard(
    parts: &mut Parts,
    state: &AppState,
    require_admin: bool,
) -> Result<UserRecord, GuardRejection> {
    let Ok(CurrentSession(session)) = CurrentSession::from_request_parts(parts, state).await;
    let is_api = parts.uri.path().starts_with("/api/");

    let slot = RedirectSlot::default();
    let view = RouteGuard::new(&slot)
        .require_admin(require_admin)
        .observe(&session);

    match (view, session.user) {
        (GuardView::Children, Some(user)) => Ok(user),
        (GuardView::LoadingIndicator, _) if is_api => Err(GuardRejection::LoadingApi),
        (GuardView::LoadingIndicator, _) => Err(GuardRejection::Loading),
        (_, user) if is_api => Err(if user.is_some() {
            GuardRejection::Forbidden
        } else {
            GuardRejection::Unauthorized
        }),
        _ => Err(GuardRejection::Redirect(
            slot.target()
                .unwrap_or(yard_patrol_core::navigator::routes::SIGN_IN)
                .to_string(),
        )),
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        guard(parts, state, false).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        guard(parts, state, true).await.map(Self)
    }
}

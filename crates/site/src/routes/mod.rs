//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page with plans
//!
//! # Customer auth
//! GET  /signin                 - Sign-in page
//! POST /signin                 - Sign-in action (rate limited)
//! GET  /signup                 - Sign-up page
//! POST /signup                 - Sign-up action (rate limited)
//! POST /signout                - Sign-out action
//! GET  /dashboard              - Customer dashboard (signed in)
//!
//! # Admin portal
//! GET  /admin/login            - Admin login form
//! POST /admin/login            - Admin login action (rate limited)
//! GET  /admin/dashboard        - Admin dashboard (admin role)
//! POST /admin/logout           - Admin logout action
//!
//! # JSON API
//! POST /api/admin/login                      - Issue admin token (rate limited)
//! GET  /api/admin/me                         - Resolve admin bearer token
//! GET  /api/billing/plans                    - Plan catalog
//! GET  /api/content/edit-mode                - Read edit mode (admin)
//! PUT  /api/content/edit-mode                - Set edit mode (admin)
//! GET  /api/content/overrides/{element_id}   - Read text override (admin)
//! PUT  /api/content/overrides/{element_id}   - Set text override (admin)
//! DELETE /api/content/overrides/{element_id} - Clear text override (admin)
//! ```

pub mod admin;
pub mod api;
pub mod auth;
pub mod dashboard;
pub mod home;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Routes that accept credentials.
pub fn credential_routes() -> Router<AppState> {
    Router::new()
        .route("/signin", post(auth::sign_in))
        .route("/signup", post(auth::sign_up))
        .route("/admin/login", post(admin::login))
        .route("/api/admin/login", post(api::admin::login))
        .layer(auth_rate_limiter())
}

/// Create the JSON API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/me", get(api::admin::me))
        .route("/api/billing/plans", get(api::billing::plans))
        .route(
            "/api/content/edit-mode",
            get(api::content::get_edit_mode).put(api::content::set_edit_mode),
        )
        .route(
            "/api/content/overrides/{element_id}",
            get(api::content::get_override)
                .put(api::content::set_override)
                .delete(api::content::clear_override),
        )
}

/// Create all page and API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/signin", get(auth::sign_in_page))
        .route("/signup", get(auth::sign_up_page))
        .route("/signout", post(auth::sign_out))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/admin/login", get(admin::login_page))
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/logout", post(admin::logout))
        .merge(api_routes())
        .merge(credential_routes())
}

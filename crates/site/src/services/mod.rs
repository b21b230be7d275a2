//! Service layer.
//!
//! - [`admin_auth`] - Operator credential check and admin token registry
//! - [`admin_api`] - Client the admin login form uses to reach the login API
//! - [`identity`] - HTTP identity provider adapter
//! - [`session_store`] - `SessionStore` over `tower-sessions`
//! - [`session`] - Per-request session resolution

pub mod admin_api;
pub mod admin_auth;
pub mod identity;
pub mod session;
pub mod session_store;

pub use admin_api::AdminApiClient;
pub use admin_auth::AdminAuthService;
pub use identity::HttpIdentityProvider;
pub use session::resolve_session;
pub use session_store::TowerSessionStore;

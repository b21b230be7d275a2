//! Per-request session resolution.
//!
//! Turns what the visitor's session store holds into a [`Session`]:
//!
//! 1. An admin token the login API still recognizes resolves to the operator.
//! 2. Otherwise an identity access token is resolved through the provider.
//! 3. Otherwise the visitor is signed out.
//!
//! When a backend that could answer is unreachable the session stays
//! `loading`, so guarded views wait instead of redirecting a signed-in visitor.

use yard_patrol_core::Session;
use yard_patrol_core::identity::{IdentityError, IdentityProvider};
use yard_patrol_core::store::{SessionStore, keys};

use crate::services::admin_api::AdminApiClient;

/// Resolve the current visitor's session.
pub async fn resolve_session<S, P>(store: &S, admin: &AdminApiClient, identity: &P) -> Session
where
    S: SessionStore,
    P: IdentityProvider,
{
    let (admin_token, identity_token) =
        match (store.get(keys::ADMIN_TOKEN).await, store.get(keys::IDENTITY_TOKEN).await) {
            (Ok(admin_token), Ok(identity_token)) => (admin_token, identity_token),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Session store unavailable");
                return Session::loading();
            }
        };

    if let Some(token) = admin_token {
        match admin.authorize(&token).await {
            Ok(Some(operator)) => return Session::signed_in(operator),
            Ok(None) => tracing::debug!("Stored admin token is not recognized"),
            Err(e) => {
                tracing::warn!(error = %e, "Admin API unavailable while resolving session");
                return Session::loading();
            }
        }
    }

    let Some(token) = identity_token else {
        return Session::signed_out();
    };

    match identity.current_user(&token).await {
        Ok(Some(user)) => Session::signed_in(user),
        Ok(None) => Session::signed_out(),
        Err(IdentityError::Unavailable(reason)) => {
            tracing::warn!(reason = %reason, "Identity provider unavailable while resolving session");
            Session::loading()
        }
        Err(e) => {
            tracing::debug!(error = %e, "Identity token rejected");
            Session::signed_out()
        }
    }
}

//! Identity provider adapter surface.
//!
//! The rest of the portal sees the identity provider as `{user, loading,
//! signOut, signUp}` plus password sign-in. [`IdentityProvider`] is the
//! network-facing half; the web crate turns its results into a
//! [`Session`](crate::Session).

use std::future::Future;

use secrecy::SecretString;

use crate::session::{UserMetadata, UserRecord};
use crate::types::Email;

/// Errors returned by an identity provider.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Email/password pair was not accepted.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The provider refused the request (duplicate account, weak password, ...).
    #[error("{0}")]
    Rejected(String),

    /// The provider could not be reached or answered with garbage.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Access token plus the user it belongs to.
#[derive(Debug, Clone)]
pub struct IdentityGrant {
    pub access_token: SecretString,
    pub user: UserRecord,
}

/// Result of a sign-up request.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// Account created and signed in immediately.
    SignedIn(IdentityGrant),
    /// Account created; the provider sent a confirmation email first.
    ConfirmationRequired,
}

/// A third-party identity provider.
pub trait IdentityProvider: Send + Sync {
    /// Resolve an access token to its user.
    ///
    /// `Ok(None)` means the token is not (or no longer) valid.
    fn current_user(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, IdentityError>> + Send;

    /// Password sign-in.
    fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<IdentityGrant, IdentityError>> + Send;

    /// Create an account with the given metadata.
    fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        metadata: UserMetadata,
    ) -> impl Future<Output = Result<SignUpOutcome, IdentityError>> + Send;

    /// Revoke an access token.
    fn sign_out(&self, access_token: &str) -> impl Future<Output = Result<(), IdentityError>> + Send;
}

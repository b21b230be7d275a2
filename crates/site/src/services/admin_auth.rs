//! Admin login backend.
//!
//! Verifies the configured operator credentials and mints opaque admin
//! tokens. Issued tokens live in an in-process registry until they are
//! revoked or the process exits; they carry no expiry of their own.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::RwLock;

use yard_patrol_core::UserRecord;
use yard_patrol_core::login::{AdminAuthApi, AdminAuthError, AdminToken, Credentials};

use crate::config::AdminCredentialsConfig;

/// Bytes of randomness in an admin token.
const TOKEN_BYTES: usize = 32;

/// Errors from the admin credential check.
#[derive(Debug, Error)]
pub enum AdminCredentialError {
    /// Wrong username or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The configured hash could not be used.
    #[error("password hashing error")]
    PasswordHash,
}

/// Verifies operator credentials and tracks issued admin tokens.
#[derive(Clone)]
pub struct AdminAuthService {
    inner: Arc<AdminAuthInner>,
}

struct AdminAuthInner {
    username: String,
    password_hash: SecretString,
    tokens: RwLock<HashMap<String, UserRecord>>,
}

impl AdminAuthService {
    #[must_use]
    pub fn new(config: &AdminCredentialsConfig) -> Self {
        Self {
            inner: Arc::new(AdminAuthInner {
                username: config.username.clone(),
                password_hash: config.password_hash.clone(),
                tokens: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Check credentials and issue a new token.
    ///
    /// # Errors
    ///
    /// Returns `AdminCredentialError::InvalidCredentials` for a wrong username
    /// or password.
    pub async fn issue_token(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<AdminToken, AdminCredentialError> {
        // Always run the hash check so a wrong username costs the same as a wrong password.
        let password_ok = verify_password(
            password.expose_secret(),
            self.inner.password_hash.expose_secret(),
        );
        let username_ok = username == self.inner.username;

        match password_ok {
            Ok(()) if username_ok => {}
            Ok(()) | Err(AdminCredentialError::InvalidCredentials) => {
                tracing::warn!(username = %username, "Admin login rejected");
                return Err(AdminCredentialError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        }

        let token = generate_token();
        self.inner
            .tokens
            .write()
            .await
            .insert(token.clone(), UserRecord::operator());
        tracing::info!(username = %username, "Admin token issued");

        Ok(AdminToken::new(token))
    }

    /// Resolve an issued token to the operator record.
    pub async fn authorize(&self, token: &str) -> Option<UserRecord> {
        self.inner.tokens.read().await.get(token).cloned()
    }

    /// Forget a token. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) {
        self.inner.tokens.write().await.remove(token);
    }
}

impl AdminAuthApi for AdminAuthService {
    async fn login(&self, credentials: &Credentials) -> Result<AdminToken, AdminAuthError> {
        self.issue_token(&credentials.username, &credentials.password)
            .await
            .map_err(|e| match e {
                AdminCredentialError::InvalidCredentials => {
                    AdminAuthError::Rejected(Some("Invalid credentials".to_string()))
                }
                AdminCredentialError::PasswordHash => AdminAuthError::Rejected(None),
            })
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AdminCredentialError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AdminCredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AdminCredentialError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AdminCredentialError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AdminCredentialError::PasswordHash)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AdminCredentialError::InvalidCredentials)
}

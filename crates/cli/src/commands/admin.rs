//! Admin operator commands.
//!
//! # Usage
//!
//! ```bash
//! printf '%s' 'my admin password' | yp-cli admin hash-password
//! ```
//!
//! The printed PHC string goes into `ADMIN_PASSWORD_HASH`.

use std::io::{BufRead, Write};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use yard_patrol_site::services::admin_auth::{self, AdminCredentialError};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Nothing was read from stdin.
    #[error("Password is required (pipe it on stdin)")]
    EmptyPassword,

    /// Reading the password or writing the hash failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Hashing failed.
    #[error("Failed to hash password: {0}")]
    Hash(#[from] AdminCredentialError),
}

/// Read one password line from `input` and write its Argon2 hash to `output`.
///
/// # Errors
///
/// Returns an error if the password is empty, or on I/O or hashing failure.
pub fn hash_password(mut input: impl BufRead, mut output: impl Write) -> Result<(), AdminError> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let password = SecretString::from(line.trim_end_matches(['\r', '\n']).to_string());
    if password.expose_secret().is_empty() {
        return Err(AdminError::EmptyPassword);
    }

    let hash = admin_auth::hash_password(password.expose_secret())?;
    writeln!(output, "{hash}")?;
    tracing::info!("Set ADMIN_PASSWORD_HASH to the printed value");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use yard_patrol_site::config::validate_password_hash;

    #[test]
    fn test_hash_password_prints_valid_phc_string() {
        let mut output = Vec::new();
        hash_password("hunter2 with spaces\n".as_bytes(), &mut output).unwrap();

        let printed = String::from_utf8(output).unwrap();
        let hash = printed.trim_end();
        assert!(hash.starts_with("$argon2"));
        validate_password_hash(&SecretString::from(hash.to_string()), "ADMIN_PASSWORD_HASH")
            .unwrap();
    }

    #[test]
    fn test_hash_password_rejects_empty_input() {
        let mut output = Vec::new();
        let err = hash_password("\n".as_bytes(), &mut output).unwrap_err();
        assert!(matches!(err, AdminError::EmptyPassword));
        assert!(output.is_empty());
    }
}

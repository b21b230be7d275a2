//! Session store backed by the visitor's server-side session.

use tower_sessions::Session;

use yard_patrol_core::store::{SessionStore, StoreError};

/// [`SessionStore`] over a `tower-sessions` session.
///
/// Values are stored as JSON strings under the given keys, so they sit next to
/// any other session data without a separate namespace.
#[derive(Clone, Debug)]
pub struct TowerSessionStore {
    session: Session,
}

impl TowerSessionStore {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Drop every entry and rotate the session id.
    ///
    /// # Errors
    ///
    /// Returns an error if the session backend fails.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.session.flush().await.map_err(backend)
    }
}

fn backend(err: tower_sessions::session::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

impl SessionStore for TowerSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.session.get::<String>(key).await.map_err(backend)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.session.insert(key, value).await.map_err(backend)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.session
            .remove::<String>(key)
            .await
            .map(|_| ())
            .map_err(backend)
    }
}

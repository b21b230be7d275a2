//! Key/value session store.
//!
//! The portal keeps a handful of plain string entries per visitor: the admin
//! token, the identity provider access token and the inline content-editing
//! entries. The web crate backs this with the server-side session; tests use
//! [`MemoryStore`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

/// Fixed keys used in the session store.
pub mod keys {
    /// Opaque token returned by `POST /api/admin/login`.
    pub const ADMIN_TOKEN: &str = "admin_token";
    /// Access token issued by the identity provider.
    pub const IDENTITY_TOKEN: &str = "identity_token";
    /// `"true"`/`"false"` flag for the inline content editor.
    pub const EDIT_MODE: &str = "edit_mode";
    /// Prefix for per-element content overrides.
    pub const CONTENT_OVERRIDE_PREFIX: &str = "content_override:";

    /// Key holding the override text for `element_id`.
    #[must_use]
    pub fn content_override(element_id: &str) -> String {
        format!("{CONTENT_OVERRIDE_PREFIX}{element_id}")
    }
}

/// Errors raised by a session store backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("session store backend error: {0}")]
    Backend(String),
}

/// Persisted string key/value store scoped to one visitor.
pub trait SessionStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<S: SessionStore> SessionStore for &S {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).remove(key)
    }
}

/// In-memory store for tests and tooling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> T,
    ) -> Result<T, StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_owned()))?;
        Ok(f(&mut entries))
    }
}

impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.with_entries(|entries| {
            entries.insert(key.to_owned(), value);
        })
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get(keys::ADMIN_TOKEN).await.unwrap(), None);

        store
            .set(keys::ADMIN_TOKEN, "abc123".to_owned())
            .await
            .unwrap();
        assert_eq!(
            store.get(keys::ADMIN_TOKEN).await.unwrap().as_deref(),
            Some("abc123")
        );

        store.remove(keys::ADMIN_TOKEN).await.unwrap();
        store.remove(keys::ADMIN_TOKEN).await.unwrap();
        assert_eq!(store.get(keys::ADMIN_TOKEN).await.unwrap(), None);
    }

    #[test]
    fn test_content_override_key() {
        assert_eq!(keys::content_override("hero-title"), "content_override:hero-title");
    }
}

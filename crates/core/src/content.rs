//! Inline content editing.
//!
//! Admins can toggle an edit mode and replace the text of individual page
//! elements. Both live in the session store as plain strings: `edit_mode` holds
//! `"true"` or `"false"`, and each override sits under
//! `content_override:<element_id>`.

use crate::store::{SessionStore, StoreError, keys};

/// Longest accepted element identifier.
pub const MAX_ELEMENT_ID_LEN: usize = 64;

/// Errors from the content editor.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("element id must be 1-{MAX_ELEMENT_ID_LEN} characters of [A-Za-z0-9_-]")]
    InvalidElementId,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Check an element identifier is safe to embed in a store key.
///
/// # Errors
///
/// Returns [`ContentError::InvalidElementId`] for empty, overlong or
/// non-`[A-Za-z0-9_-]` identifiers.
pub fn validate_element_id(element_id: &str) -> Result<(), ContentError> {
    let valid = !element_id.is_empty()
        && element_id.len() <= MAX_ELEMENT_ID_LEN
        && element_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(ContentError::InvalidElementId)
    }
}

/// Reads and writes the content-editing entries of one session.
#[derive(Debug)]
pub struct ContentEditor<S> {
    store: S,
}

impl<S: SessionStore> ContentEditor<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Whether edit mode is on. Anything other than `"true"` counts as off.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn edit_mode(&self) -> Result<bool, ContentError> {
        Ok(self.store.get(keys::EDIT_MODE).await?.as_deref() == Some("true"))
    }

    /// Turn edit mode on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn set_edit_mode(&self, enabled: bool) -> Result<(), ContentError> {
        self.store
            .set(keys::EDIT_MODE, enabled.to_string())
            .await?;
        Ok(())
    }

    /// Override text for `element_id`, if one is stored.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid element id or a store failure.
    pub async fn override_text(&self, element_id: &str) -> Result<Option<String>, ContentError> {
        validate_element_id(element_id)?;
        Ok(self.store.get(&keys::content_override(element_id)).await?)
    }

    /// Store override text for `element_id`.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid element id or a store failure.
    pub async fn set_override(&self, element_id: &str, text: String) -> Result<(), ContentError> {
        validate_element_id(element_id)?;
        self.store
            .set(&keys::content_override(element_id), text)
            .await?;
        Ok(())
    }

    /// Drop the override for `element_id`.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid element id or a store failure.
    pub async fn clear_override(&self, element_id: &str) -> Result<(), ContentError> {
        validate_element_id(element_id)?;
        self.store
            .remove(&keys::content_override(element_id))
            .await?;
        Ok(())
    }

    /// Resolve the text to show: the override when present, otherwise `default`.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid element id or a store failure.
    pub async fn text_or(&self, element_id: &str, default: &str) -> Result<String, ContentError> {
        Ok(self
            .override_text(element_id)
            .await?
            .unwrap_or_else(|| default.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_edit_mode_defaults_off_and_persists_as_string() {
        let store = MemoryStore::new();
        let editor = ContentEditor::new(&store);
        assert!(!editor.edit_mode().await.unwrap());

        editor.set_edit_mode(true).await.unwrap();
        assert!(editor.edit_mode().await.unwrap());
        assert_eq!(store.get("edit_mode").await.unwrap().as_deref(), Some("true"));

        editor.set_edit_mode(false).await.unwrap();
        assert_eq!(store.get("edit_mode").await.unwrap().as_deref(), Some("false"));
    }

    #[tokio::test]
    async fn test_garbage_edit_mode_counts_as_off() {
        let store = MemoryStore::new();
        store.set("edit_mode", "yes".to_owned()).await.unwrap();
        assert!(!ContentEditor::new(&store).edit_mode().await.unwrap());
    }

    #[tokio::test]
    async fn test_overrides_are_keyed_per_element() {
        let store = MemoryStore::new();
        let editor = ContentEditor::new(&store);

        editor
            .set_override("hero-title", "Scoop there it is".to_owned())
            .await
            .unwrap();
        assert_eq!(
            store
                .get("content_override:hero-title")
                .await
                .unwrap()
                .as_deref(),
            Some("Scoop there it is")
        );
        assert_eq!(
            editor.text_or("hero-title", "Default").await.unwrap(),
            "Scoop there it is"
        );
        assert_eq!(editor.text_or("hero_sub", "Default").await.unwrap(), "Default");

        editor.clear_override("hero-title").await.unwrap();
        assert_eq!(editor.override_text("hero-title").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_unsafe_element_ids() {
        let store = MemoryStore::new();
        let editor = ContentEditor::new(&store);
        let long = "x".repeat(65);
        for bad in ["", "a:b", "../x", "has space", long.as_str()] {
            assert_eq!(
                editor.set_override(bad, "text".to_owned()).await,
                Err(ContentError::InvalidElementId),
                "{bad:?}"
            );
        }
    }
}

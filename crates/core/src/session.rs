//! Resolved visitor session.
//!
//! A [`Session`] is what the identity provider adapter hands to the rest of the
//! portal: either still loading, or resolved with/without a [`UserRecord`].

use serde::{Deserialize, Serialize};

use crate::types::{Email, UserId};

/// Role metadata value that grants access to admin-only views.
pub const ADMIN_ROLE: &str = "admin";

/// Free-form metadata attached to a user by the identity provider.
///
/// Only `role` is interpreted by the portal. Everything else is carried through
/// untouched so sign-up metadata round-trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Role string, e.g. `"admin"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Display name captured at sign-up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Contact phone captured at sign-up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Any other provider metadata.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An authenticated visitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Provider-issued identifier.
    pub id: UserId,
    /// Email address, when the provider knows one.
    pub email: Option<Email>,
    /// Provider metadata, including the role.
    #[serde(default)]
    pub metadata: UserMetadata,
}

impl UserRecord {
    /// Create a user with empty metadata.
    #[must_use]
    pub fn new(id: impl Into<UserId>, email: Option<Email>) -> Self {
        Self {
            id: id.into(),
            email,
            metadata: UserMetadata::default(),
        }
    }

    /// The operator signed in through the admin token login.
    #[must_use]
    pub fn operator() -> Self {
        Self {
            id: UserId::operator(),
            email: None,
            metadata: UserMetadata {
                role: Some(ADMIN_ROLE.to_owned()),
                ..UserMetadata::default()
            },
        }
    }

    /// Set the role metadata.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.metadata.role = Some(role.into());
        self
    }

    /// The role metadata, if any.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.metadata.role.as_deref()
    }

    /// Whether the role metadata is exactly `"admin"`.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Some(ADMIN_ROLE)
    }

    /// Name to greet the visitor with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.metadata
            .full_name
            .as_deref()
            .or_else(|| self.email.as_ref().map(Email::as_str))
            .unwrap_or(self.id.as_str())
    }
}

/// The resolved authentication state of the current visitor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The signed-in user; `None` when anonymous or still loading.
    pub user: Option<UserRecord>,
    /// Whether resolution is still pending.
    pub loading: bool,
}

impl Session {
    /// Resolution has not finished yet.
    #[must_use]
    pub const fn loading() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    /// Resolved to an anonymous visitor.
    #[must_use]
    pub const fn signed_out() -> Self {
        Self {
            user: None,
            loading: false,
        }
    }

    /// Resolved to a signed-in user.
    #[must_use]
    pub const fn signed_in(user: UserRecord) -> Self {
        Self {
            user: Some(user),
            loading: false,
        }
    }

    /// The signed-in user, if resolution finished with one.
    #[must_use]
    pub const fn user(&self) -> Option<&UserRecord> {
        if self.loading {
            None
        } else {
            self.user.as_ref()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_is_admin() {
        let operator = UserRecord::operator();
        assert!(operator.is_admin());
        assert_eq!(operator.id.as_str(), "operator");
    }

    #[test]
    fn test_role_must_match_exactly() {
        let user = UserRecord::new("u-1", None);
        assert!(!user.is_admin());
        assert!(!user.clone().with_role("Admin").is_admin());
        assert!(!user.clone().with_role("administrator").is_admin());
        assert!(user.with_role("admin").is_admin());
    }

    #[test]
    fn test_metadata_keeps_unknown_fields() {
        let json = r#"{"role":"customer","full_name":"Sam","dogs":2}"#;
        let metadata: UserMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.role.as_deref(), Some("customer"));
        assert_eq!(metadata.extra.get("dogs"), Some(&serde_json::json!(2)));

        let back = serde_json::to_value(&metadata).unwrap();
        assert_eq!(back["dogs"], 2);
    }

    #[test]
    fn test_loading_session_hides_user() {
        let mut session = Session::signed_in(UserRecord::new("u-1", None));
        assert!(session.user().is_some());
        session.loading = true;
        assert!(session.user().is_none());
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        let email = Email::parse("sam@example.com").unwrap();
        let mut user = UserRecord::new("u-1", Some(email));
        assert_eq!(user.display_name(), "sam@example.com");
        user.metadata.full_name = Some("Sam Rivera".to_owned());
        assert_eq!(user.display_name(), "Sam Rivera");
    }
}

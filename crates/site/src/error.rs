//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Responses carry a `{"message": ...}` JSON body,
//! the shape the admin login API and the content API promise their callers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use yard_patrol_core::content::ContentError;

use crate::services::admin_auth::AdminCredentialError;

/// Application-level error type for the site.
#[derive(Debug, Error)]
pub enum AppError {
    /// Admin credential check failed.
    #[error("Admin auth error: {0}")]
    AdminAuth(#[from] AdminCredentialError),

    /// Content editing failed.
    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::AdminAuth(AdminCredentialError::InvalidCredentials) | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Content(ContentError::InvalidElementId) => StatusCode::BAD_REQUEST,
            Self::AdminAuth(AdminCredentialError::PasswordHash)
            | Self::Content(ContentError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal details stay in logs.
    fn public_message(&self) -> String {
        match self {
            Self::AdminAuth(AdminCredentialError::InvalidCredentials) => {
                "Invalid credentials".to_string()
            }
            Self::Content(ContentError::InvalidElementId) => {
                ContentError::InvalidElementId.to_string()
            }
            Self::AdminAuth(AdminCredentialError::PasswordHash)
            | Self::Content(ContentError::Store(_)) => "Internal server error".to_string(),
            Self::Unauthorized(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use yard_patrol_core::store::StoreError;

    async fn body_message(err: AppError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, json["message"].as_str().unwrap().to_string())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Unauthorized("Missing bearer token".to_string());
        assert_eq!(err.to_string(), "Unauthorized: Missing bearer token");
    }

    #[tokio::test]
    async fn test_admin_rejection_is_401_with_message() {
        let (status, message) =
            body_message(AdminCredentialError::InvalidCredentials.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message, "Invalid credentials");
    }

    #[tokio::test]
    async fn test_store_failure_details_are_hidden() {
        let err = ContentError::Store(StoreError::Backend("store at 10.0.0.7 refused".to_string()));
        let (status, message) = body_message(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }

    #[tokio::test]
    async fn test_invalid_element_id_is_400() {
        let (status, message) = body_message(ContentError::InvalidElementId.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, ContentError::InvalidElementId.to_string());
    }
}

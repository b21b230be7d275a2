//! Inline content editing API.
//!
//! Admin only. Edit mode and text overrides live in the admin's own session,
//! so they only change what that browser sees.

use axum::{
    Json,
    extract::Path,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use yard_patrol_core::content::ContentEditor;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::services::TowerSessionStore;

/// Body of the edit-mode endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct EditMode {
    pub enabled: bool,
}

/// Body of `PUT /api/content/overrides/{element_id}`.
#[derive(Debug, Deserialize)]
pub struct SetOverride {
    pub text: String,
}

/// Body of `GET`/`PUT /api/content/overrides/{element_id}`.
#[derive(Debug, Serialize)]
pub struct ContentOverride {
    pub element_id: String,
    /// `None` when the element shows its default text.
    pub text: Option<String>,
}

fn editor(session: Session) -> ContentEditor<TowerSessionStore> {
    ContentEditor::new(TowerSessionStore::new(session))
}

/// Read edit mode.
pub async fn get_edit_mode(_admin: RequireAdmin, session: Session) -> Result<Json<EditMode>> {
    let enabled = editor(session).edit_mode().await?;
    Ok(Json(EditMode { enabled }))
}

/// Turn edit mode on or off.
#[instrument(skip_all, fields(enabled = body.enabled))]
pub async fn set_edit_mode(
    _admin: RequireAdmin,
    session: Session,
    Json(body): Json<EditMode>,
) -> Result<Json<EditMode>> {
    editor(session).set_edit_mode(body.enabled).await?;
    Ok(Json(body))
}

/// Read the override for one element.
pub async fn get_override(
    _admin: RequireAdmin,
    session: Session,
    Path(element_id): Path<String>,
) -> Result<Json<ContentOverride>> {
    let text = editor(session).override_text(&element_id).await?;
    Ok(Json(ContentOverride { element_id, text }))
}

/// Replace the text of one element.
#[instrument(skip_all, fields(element_id = %element_id))]
pub async fn set_override(
    _admin: RequireAdmin,
    session: Session,
    Path(element_id): Path<String>,
    Json(body): Json<SetOverride>,
) -> Result<Json<ContentOverride>> {
    editor(session)
        .set_override(&element_id, body.text.clone())
        .await?;
    Ok(Json(ContentOverride {
        element_id,
        text: Some(body.text),
    }))
}

/// Restore the default text of one element.
#[instrument(skip_all, fields(element_id = %element_id))]
pub async fn clear_override(
    _admin: RequireAdmin,
    session: Session,
    Path(element_id): Path<String>,
) -> Result<StatusCode> {
    editor(session).clear_override(&element_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Marketing home page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use yard_patrol_core::billing::Plan;
use yard_patrol_core::content::ContentEditor;

use crate::filters;
use crate::middleware::CurrentSession;
use crate::models::NavUser;
use crate::services::TowerSessionStore;
use crate::state::AppState;

/// Editable headline element.
pub const HERO_TITLE_ID: &str = "hero-title";
/// Editable sub-headline element.
pub const HERO_SUBTITLE_ID: &str = "hero-subtitle";

const DEFAULT_HERO_TITLE: &str = "We scoop. You enjoy the yard.";
const DEFAULT_HERO_SUBTITLE: &str =
    "Reliable pet waste removal on a schedule that fits your household.";

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: Option<NavUser>,
    pub hero_title: String,
    pub hero_subtitle: String,
    /// Marks editable elements for the inline editor script.
    pub edit_mode: bool,
    pub plans: Vec<Plan>,
}

/// Display the home page.
///
/// Content overrides saved by an admin in this session replace the default
/// hero copy.
#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    current: CurrentSession,
    session: Session,
) -> impl IntoResponse {
    let editor = ContentEditor::new(TowerSessionStore::new(session));
    let hero_title = editable_text(&editor, HERO_TITLE_ID, DEFAULT_HERO_TITLE).await;
    let hero_subtitle = editable_text(&editor, HERO_SUBTITLE_ID, DEFAULT_HERO_SUBTITLE).await;

    let is_admin = current.0.user().is_some_and(|user| user.is_admin());
    let edit_mode = is_admin && editor.edit_mode().await.unwrap_or(false);

    HomeTemplate {
        nav: current.nav(),
        hero_title,
        hero_subtitle,
        edit_mode,
        plans: state.config().billing.plans().to_vec(),
    }
}

async fn editable_text(
    editor: &ContentEditor<TowerSessionStore>,
    element_id: &str,
    default: &str,
) -> String {
    match editor.text_or(element_id, default).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(element_id = %element_id, error = %e, "Falling back to default copy");
            default.to_string()
        }
    }
}

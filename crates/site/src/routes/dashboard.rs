//! Customer dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use yard_patrol_core::billing::Plan;
use yard_patrol_core::UserRecord;

use crate::filters;
use crate::middleware::RequireUser;
use crate::models::NavUser;
use crate::state::AppState;

/// Customer dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub nav: Option<NavUser>,
    pub user: UserRecord,
    pub plans: Vec<Plan>,
}

/// Display the signed-in visitor's dashboard.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> impl IntoResponse {
    DashboardTemplate {
        nav: Some(NavUser::from(&user)),
        plans: state.config().billing.plans().to_vec(),
        user,
    }
}

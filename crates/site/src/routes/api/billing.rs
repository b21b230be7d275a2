//! Billing catalog API.

use axum::{Json, extract::State};
use serde::Serialize;

use yard_patrol_core::billing::Plan;

use crate::state::AppState;

/// Body of `GET /api/billing/plans`.
#[derive(Debug, Serialize)]
pub struct PlansResponse {
    /// Stripe publishable key for checkout, when configured.
    pub publishable_key: Option<String>,
    pub plans: Vec<PlanSummary>,
}

/// A plan as published to checkout pages.
#[derive(Debug, Serialize)]
pub struct PlanSummary {
    #[serde(flatten)]
    pub plan: Plan,
    pub price_label: String,
}

/// List the purchasable plans.
pub async fn plans(State(state): State<AppState>) -> Json<PlansResponse> {
    let billing = &state.config().billing;
    Json(PlansResponse {
        publishable_key: billing.publishable_key().map(|key| key.as_str().to_string()),
        plans: billing
            .plans()
            .iter()
            .map(|plan| PlanSummary {
                price_label: plan.price_label(),
                plan: plan.clone(),
            })
            .collect(),
    })
}

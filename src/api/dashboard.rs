//! Dashboard endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, models::DashboardSummary};

/// Catalog totals and the overdue loan list
#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "dashboard",
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardSummary)
    )
)]
pub async fn get_dashboard(State(state): State<crate::AppState>) -> AppResult<Json<DashboardSummary>> {
    let summary = state.services.dashboard.summary().await?;
    Ok(Json(summary))
}

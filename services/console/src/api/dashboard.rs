//! Dashboard API handler.
//!
//! # Purpose
//! Entity counts for the dashboard shell. Requires authentication but no
//! specific permission; every signed-in operator sees the summary.
use crate::api::error::{ApiError, api_internal};
use crate::api::types::DashboardSummary;
use crate::app::AppState;
use crate::auth::guard::authenticate;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

#[utoipa::path(
    get,
    path = "/v1/dashboard",
    tag = "dashboard",
    responses(
        (status = 200, description = "Entity counts", body = DashboardSummary),
        (status = 401, description = "Unauthenticated", body = crate::api::types::ErrorResponse)
    ),
)]
pub(crate) async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardSummary>, ApiError> {
    authenticate(&state, &headers).await?;
    let counts = state
        .store
        .dashboard_counts()
        .await
        .map_err(|err| api_internal("failed to load dashboard counts", &err))?;
    Ok(Json(DashboardSummary {
        users: counts.users,
        trashed_users: counts.trashed_users,
        roles: counts.roles,
        permissions: counts.permissions,
    }))
}

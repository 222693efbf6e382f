use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{AnalyticsStats, TrendPoint},
};

/// get_stats
///
/// [Authenticated Route] Counters over the caller's scope. `activeVisitors` counts
/// visitors still awaiting a decision.
#[utoipa::path(
    get,
    path = "/api/analytics/stats",
    responses((status = 200, description = "Dashboard counters", body = AnalyticsStats))
)]
pub async fn get_stats(
    identity: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AnalyticsStats>, AppError> {
    Ok(Json(state.analytics_service().stats(&identity).await?))
}

#[utoipa::path(
    get,
    path = "/api/analytics/visitors/trend",
    responses((status = 200, description = "Visitors per day", body = [TrendPoint]))
)]
pub async fn get_visitor_trend(
    identity: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TrendPoint>>, AppError> {
    Ok(Json(state.analytics_service().visitor_trend(&identity).await?))
}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{AccessRule, AccessRuleRequest, MessageResponse},
};

#[utoipa::path(
    get,
    path = "/api/access-control",
    responses(
        (status = 200, description = "All access rules", body = [AccessRule]),
        (status = 403, description = "Admins only")
    )
)]
pub async fn get_access_rules(
    identity: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AccessRule>>, AppError> {
    Ok(Json(state.access_rule_service().list(&identity).await?))
}

/// create_access_rule
///
/// [Admin] Unknown actions are rejected by name ("Invalid actions: a, b").
#[utoipa::path(
    post,
    path = "/api/access-control",
    request_body = AccessRuleRequest,
    responses(
        (status = 201, description = "Created", body = AccessRule),
        (status = 400, description = "Invalid role, resource or actions")
    )
)]
pub async fn create_access_rule(
    identity: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<AccessRuleRequest>,
) -> Result<(StatusCode, Json<AccessRule>), AppError> {
    let rule = state
        .access_rule_service()
        .create(&identity, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

/// update_access_rule
///
/// [Admin] Replaces the whole rule.
#[utoipa::path(
    put,
    path = "/api/access-control/{id}",
    params(("id" = Uuid, Path, description = "Access rule ID")),
    request_body = AccessRuleRequest,
    responses(
        (status = 200, description = "Updated", body = AccessRule),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_access_rule(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AccessRuleRequest>,
) -> Result<Json<AccessRule>, AppError> {
    Ok(Json(
        state
            .access_rule_service()
            .update(&identity, id, payload)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/access-control/{id}",
    params(("id" = Uuid, Path, description = "Access rule ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_access_rule(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(state.access_rule_service().delete(&identity, id).await?))
}

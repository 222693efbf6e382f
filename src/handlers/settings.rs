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
    models::{CreateSettingRequest, MessageResponse, Setting, UpdateSettingRequest},
};

#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "All settings", body = [Setting]),
        (status = 403, description = "Admins only")
    )
)]
pub async fn get_settings(
    identity: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Setting>>, AppError> {
    Ok(Json(state.settings_service().list(&identity).await?))
}

#[utoipa::path(
    post,
    path = "/api/settings",
    request_body = CreateSettingRequest,
    responses(
        (status = 201, description = "Created", body = Setting),
        (status = 400, description = "Missing field or duplicate key")
    )
)]
pub async fn create_setting(
    identity: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateSettingRequest>,
) -> Result<(StatusCode, Json<Setting>), AppError> {
    let setting = state.settings_service().create(&identity, payload).await?;
    Ok((StatusCode::CREATED, Json(setting)))
}

#[utoipa::path(
    put,
    path = "/api/settings/{id}",
    params(("id" = Uuid, Path, description = "Setting ID")),
    request_body = UpdateSettingRequest,
    responses(
        (status = 200, description = "Updated", body = Setting),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_setting(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSettingRequest>,
) -> Result<Json<Setting>, AppError> {
    Ok(Json(
        state.settings_service().update(&identity, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/settings/{id}",
    params(("id" = Uuid, Path, description = "Setting ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_setting(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(state.settings_service().delete(&identity, id).await?))
}

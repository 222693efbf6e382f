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
    models::{CreateUserRequest, MessageResponse, UpdateUserRequest, User},
};

/// get_users
///
/// [Admin, Company] Admins see every account; a company sees its receptionists.
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Users in scope", body = [User]),
        (status = 403, description = "Role not permitted")
    )
)]
pub async fn get_users(
    identity: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.user_service().list(&identity).await?))
}

/// create_user
///
/// [Admin, Company] Companies can only create receptionists for themselves.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Invalid input or email already in use")
    )
)]
pub async fn create_user(
    identity: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.user_service().create(&identity, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.user_service().update(&identity, id, payload).await?))
}

/// delete_user
///
/// [Admin] Refused for companies that still own receptionists or visitors.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "Company has dependents"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(state.user_service().delete(&identity, id).await?))
}

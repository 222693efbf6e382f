use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{AuthResponse, LoginRequest, User},
};

/// login
///
/// [Public Route] Exchanges email and password for a session token and the user record.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(state.auth_service().login(payload).await?))
}

/// get_me
///
/// [Authenticated Route] The stored record of the caller.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_me(
    identity: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.auth_service().me(&identity).await?))
}

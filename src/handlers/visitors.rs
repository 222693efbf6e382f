use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, LinkAction},
    error::AppError,
    models::{
        CreateVisitorRequest, MessageResponse, NotifyVisitorRequest, UpdateVisitorRequest,
        UpdateVisitorStatusRequest, Visitor,
    },
    notifications::DecisionPage,
};

/// LinkQuery
///
/// The signed token carried by approve and reject links.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct LinkQuery {
    pub token: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/visitors",
    responses((status = 200, description = "Visitors in scope", body = [Visitor]))
)]
pub async fn get_visitors(
    identity: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Visitor>>, AppError> {
    Ok(Json(state.visitor_service().list(&identity).await?))
}

/// get_company_visitors
///
/// [Company, Receptionist] `companyId` is a company id or code inside the caller's scope.
#[utoipa::path(
    get,
    path = "/api/visitors/company/{companyId}",
    params(("companyId" = String, Path, description = "Company ID or code")),
    responses(
        (status = 200, description = "Visitors of the company", body = [Visitor]),
        (status = 403, description = "Company outside the caller's scope"),
        (status = 404, description = "Company not found")
    )
)]
pub async fn get_company_visitors(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Json<Vec<Visitor>>, AppError> {
    Ok(Json(
        state
            .visitor_service()
            .list_for_company(&identity, &company_id)
            .await?,
    ))
}

/// create_visitor
///
/// [Admin, Receptionist] Registers a pending visitor.
#[utoipa::path(
    post,
    path = "/api/visitors",
    request_body = CreateVisitorRequest,
    responses(
        (status = 201, description = "Created", body = Visitor),
        (status = 400, description = "Invalid input or unknown company"),
        (status = 403, description = "Company outside the caller's scope")
    )
)]
pub async fn create_visitor(
    identity: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateVisitorRequest>,
) -> Result<(StatusCode, Json<Visitor>), AppError> {
    let visitor = state.visitor_service().create(&identity, payload).await?;
    Ok((StatusCode::CREATED, Json(visitor)))
}

#[utoipa::path(
    put,
    path = "/api/visitors/{id}",
    params(("id" = Uuid, Path, description = "Visitor ID")),
    request_body = UpdateVisitorRequest,
    responses(
        (status = 200, description = "Updated", body = Visitor),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_visitor(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVisitorRequest>,
) -> Result<Json<Visitor>, AppError> {
    Ok(Json(
        state.visitor_service().update(&identity, id, payload).await?,
    ))
}

/// update_visitor_status
///
/// [Admin, Company] Sets the status directly.
#[utoipa::path(
    put,
    path = "/api/visitors/{id}/status",
    params(("id" = Uuid, Path, description = "Visitor ID")),
    request_body = UpdateVisitorStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Visitor),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_visitor_status(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVisitorStatusRequest>,
) -> Result<Json<Visitor>, AppError> {
    Ok(Json(
        state
            .visitor_service()
            .update_status(&identity, id, payload.status)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/visitors/{id}",
    params(("id" = Uuid, Path, description = "Visitor ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_visitor(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(state.visitor_service().delete(&identity, id).await?))
}

/// notify_visitor
///
/// [Admin, Receptionist] Emails the contact person an approve and a reject link.
#[utoipa::path(
    post,
    path = "/api/visitors/notify",
    request_body = NotifyVisitorRequest,
    responses(
        (status = 200, description = "Sent", body = MessageResponse),
        (status = 400, description = "No contact email"),
        (status = 500, description = "Delivery failed")
    )
)]
pub async fn notify_visitor(
    identity: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<NotifyVisitorRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(
        state
            .notification_service()
            .notify(&identity, payload)
            .await?,
    ))
}

/// approve_visitor
///
/// [Public Route] Target of the Approve link. Answers with an HTML page.
#[utoipa::path(
    get,
    path = "/api/visitors/approve/{id}",
    params(("id" = Uuid, Path, description = "Visitor ID"), LinkQuery),
    responses(
        (status = 200, description = "Approved", body = String, content_type = "text/html"),
        (status = 403, description = "Invalid or expired link"),
        (status = 404, description = "Visitor not found"),
        (status = 409, description = "Already decided")
    )
)]
pub async fn approve_visitor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LinkQuery>,
) -> Result<DecisionPage, AppError> {
    state
        .notification_service()
        .decide(id, LinkAction::Approve, query.token.as_deref())
        .await
}

/// reject_visitor
///
/// [Public Route] Target of the Reject link. Answers with an HTML page.
#[utoipa::path(
    get,
    path = "/api/visitors/reject/{id}",
    params(("id" = Uuid, Path, description = "Visitor ID"), LinkQuery),
    responses(
        (status = 200, description = "Rejected", body = String, content_type = "text/html"),
        (status = 403, description = "Invalid or expired link"),
        (status = 404, description = "Visitor not found"),
        (status = 409, description = "Already decided")
    )
)]
pub async fn reject_visitor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LinkQuery>,
) -> Result<DecisionPage, AppError> {
    state
        .notification_service()
        .decide(id, LinkAction::Reject, query.token.as_deref())
        .await
}

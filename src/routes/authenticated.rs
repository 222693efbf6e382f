use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes that require a valid session. Which roles may call each one, and which
/// records they see, is decided by the service behind the handler.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /auth/me
        .route("/auth/me", get(handlers::auth::get_me))
        // --- Users (admin, company) ---
        .route(
            "/users",
            get(handlers::users::get_users).post(handlers::users::create_user),
        )
        // PUT/DELETE /users/{id} (admin)
        .route(
            "/users/{id}",
            put(handlers::users::update_user).delete(handlers::users::delete_user),
        )
        // --- Visitors ---
        .route(
            "/visitors",
            get(handlers::visitors::get_visitors).post(handlers::visitors::create_visitor),
        )
        // POST /visitors/notify (admin, receptionist)
        .route("/visitors/notify", post(handlers::visitors::notify_visitor))
        // GET /visitors/company/{companyId} (company, receptionist)
        .route(
            "/visitors/company/{companyId}",
            get(handlers::visitors::get_company_visitors),
        )
        .route(
            "/visitors/{id}",
            put(handlers::visitors::update_visitor).delete(handlers::visitors::delete_visitor),
        )
        // PUT /visitors/{id}/status (admin, company)
        .route(
            "/visitors/{id}/status",
            put(handlers::visitors::update_visitor_status),
        )
        // --- Analytics ---
        .route("/analytics/stats", get(handlers::analytics::get_stats))
        .route(
            "/analytics/visitors/trend",
            get(handlers::analytics::get_visitor_trend),
        )
}

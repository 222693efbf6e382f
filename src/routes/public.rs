use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that are **unauthenticated**. The decision links are protected by their
/// own signed token instead of a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/login
        .route("/auth/login", post(handlers::auth::login))
        // GET /visitors/approve/{id}?token=...
        // GET /visitors/reject/{id}?token=...
        // Targets of the links in the notification email. Answer with HTML.
        .route(
            "/visitors/approve/{id}",
            get(handlers::visitors::approve_visitor),
        )
        .route(
            "/visitors/reject/{id}",
            get(handlers::visitors::reject_visitor),
        )
}

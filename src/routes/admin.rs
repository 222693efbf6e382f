use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Global configuration resources. Mounted behind the authentication layer; the
/// Settings and AccessRules scopes admit admins only.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /access-control
        .route(
            "/access-control",
            get(handlers::access_rules::get_access_rules)
                .post(handlers::access_rules::create_access_rule),
        )
        // PUT/DELETE /access-control/{id}
        .route(
            "/access-control/{id}",
            put(handlers::access_rules::update_access_rule)
                .delete(handlers::access_rules::delete_access_rule),
        )
        // GET/POST /settings
        .route(
            "/settings",
            get(handlers::settings::get_settings).post(handlers::settings::create_setting),
        )
        // PUT/DELETE /settings/{id}
        .route(
            "/settings/{id}",
            put(handlers::settings::update_setting).delete(handlers::settings::delete_setting),
        )
}

use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod notifications;
pub mod policy;
pub mod repository;
pub mod services;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use mailer::{HttpMailer, MailerState, MockMailer};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

use notifications::NotificationService;
use services::{
    AccessRuleService, AnalyticsService, AuthService, SettingsService, UserService,
    VisitorService,
};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login, handlers::auth::get_me,
        handlers::users::get_users, handlers::users::create_user,
        handlers::users::update_user, handlers::users::delete_user,
        handlers::visitors::get_visitors, handlers::visitors::get_company_visitors,
        handlers::visitors::create_visitor, handlers::visitors::update_visitor,
        handlers::visitors::update_visitor_status, handlers::visitors::delete_visitor,
        handlers::visitors::notify_visitor, handlers::visitors::approve_visitor,
        handlers::visitors::reject_visitor,
        handlers::analytics::get_stats, handlers::analytics::get_visitor_trend,
        handlers::settings::get_settings, handlers::settings::create_setting,
        handlers::settings::update_setting, handlers::settings::delete_setting,
        handlers::access_rules::get_access_rules, handlers::access_rules::create_access_rule,
        handlers::access_rules::update_access_rule, handlers::access_rules::delete_access_rule
    ),
    components(
        schemas(
            models::Role, models::VisitorStatus, models::Action,
            models::User, models::Visitor, models::Setting, models::AccessRule,
            models::LoginRequest, models::AuthResponse,
            models::CreateUserRequest, models::UpdateUserRequest,
            models::CreateVisitorRequest, models::UpdateVisitorRequest,
            models::UpdateVisitorStatusRequest, models::NotifyVisitorRequest,
            models::CreateSettingRequest, models::UpdateSettingRequest,
            models::AccessRuleRequest, models::AnalyticsStats, models::TrendPoint,
            models::MessageResponse,
        )
    ),
    tags(
        (name = "vms", description = "Visitor Management System API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single, cloneable container shared by every request: the persistence layer,
/// the outbound mailer and the immutable configuration.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub mailer: MailerState,
    pub config: AppConfig,
}

impl AppState {
    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.repo.clone(), self.config.clone())
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(self.repo.clone(), self.config.clone())
    }

    pub fn visitor_service(&self) -> VisitorService {
        VisitorService::new(self.repo.clone())
    }

    pub fn settings_service(&self) -> SettingsService {
        SettingsService::new(self.repo.clone())
    }

    pub fn access_rule_service(&self) -> AccessRuleService {
        AccessRuleService::new(self.repo.clone())
    }

    pub fn analytics_service(&self) -> AnalyticsService {
        AnalyticsService::new(self.repo.clone())
    }

    pub fn notification_service(&self) -> NotificationService {
        NotificationService::new(self.repo.clone(), self.mailer.clone(), self.config.clone())
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated and admin routers. Extracting `AuthUser` validates the
/// session; on failure the extractor rejects with 401 before any handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure under `/api`, applies the auth layer to the
/// protected modules, and wraps everything in the observability stack.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. API Router Assembly
    let protected = authenticated::authenticated_routes()
        .merge(admin::admin_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = public::public_routes().merge(protected);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of one request carries its
/// `x-request-id` next to the method and URI.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

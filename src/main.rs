use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vms_portal::{
    AppState, HttpMailer, InMemoryRepository, MailerState, MockMailer, PostgresRepository,
    RepositoryState,
    config::{AppConfig, Env},
    create_router,
};

/// main
///
/// Initializes configuration, logging, the store, the mailer and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise debug for this crate and request logs from tower-http.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vms_portal=debug,tower_http=info".into());

    // 3. Pretty output for humans locally, JSON for log aggregation in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Store Initialization
    // Postgres when DATABASE_URL is set (always in production), in-memory otherwise.
    let repo: RepositoryState = match config.db_url.as_deref() {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            let postgres = PostgresRepository::new(pool);
            postgres
                .migrate()
                .await
                .expect("FATAL: Failed to apply database migrations.");
            tracing::info!("Connected to Postgres, migrations applied");
            Arc::new(postgres)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store (data is lost on exit)");
            Arc::new(InMemoryRepository::new())
        }
    };

    // 5. Mailer Initialization
    let mailer: MailerState = match config.mail_api_url.as_deref() {
        Some(api_url) => Arc::new(HttpMailer::new(api_url, &config.mail_api_key)),
        None => {
            tracing::warn!("MAIL_API_URL not set; notification emails are only logged");
            Arc::new(MockMailer::new())
        }
    };

    // 6. Unified State Assembly
    let app_state = AppState {
        repo,
        mailer,
        config: config.clone(),
    };

    // 7. Admin Seed (idempotent)
    if let Some(seed) = &config.seed_admin {
        if let Err(e) = app_state.auth_service().seed_admin(seed).await {
            tracing::error!(error = %e, "failed to seed admin user");
        }
    }

    // 8. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: Failed to bind {}: {}", config.bind_addr, e));

    tracing::info!("Listening on {}", config.bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: {}/swagger-ui", config.public_url);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server terminated");
    }
}

//! Resource services.
//!
//! Each service applies the role policy (`policy::authorize` and
//! `policy::resolve_scope`) before touching the repository, then enforces the entity
//! rules of its resource. Handlers stay thin and only translate HTTP to service calls.

pub mod access_rules;
pub mod analytics;
pub mod auth;
pub mod settings;
pub mod users;
pub mod visitors;

pub use access_rules::AccessRuleService;
pub use analytics::AnalyticsService;
pub use auth::AuthService;
pub use settings::SettingsService;
pub use users::UserService;
pub use visitors::VisitorService;

use crate::error::AppError;

/// hash_password
///
/// bcrypt is CPU-bound, so it runs on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {}", e)))?
        .map_err(AppError::from)
}

/// Emails are compared case-insensitively, so they are stored lowercased.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{AccessRule, Setting, TrendPoint, User, Visitor, VisitorStatus},
    policy::Scope,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Highest company code that can be assigned ("999").
pub const MAX_COMPANY_CODE: i64 = 999;

/// Repository Trait
///
/// The abstract contract for all persistence operations. Services talk to this trait
/// only, so the Postgres store and the in-memory store are interchangeable.
///
/// Every list and count method takes a `Scope`; implementations must return exactly
/// the records `Scope::admits` would accept. Uniqueness of user emails, setting keys
/// and company codes is enforced here and surfaces as `AppError::Conflict`.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across Axum's
/// task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    /// Resolves a company reference, either the company user's id or its code.
    async fn find_company(&self, reference: &str) -> Result<Option<User>, AppError>;
    async fn list_users(&self, scope: &Scope) -> Result<Vec<User>, AppError>;
    async fn count_users(&self, scope: &Scope) -> Result<i64, AppError>;
    async fn insert_user(&self, user: User) -> Result<User, AppError>;
    /// Replaces the stored user with the same id. `None` if it no longer exists.
    async fn update_user(&self, user: User) -> Result<Option<User>, AppError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;
    /// Draws the next company code. Serialized by the store; codes are never reused.
    async fn next_company_code(&self) -> Result<String, AppError>;

    // --- Visitors ---
    async fn get_visitor(&self, id: Uuid) -> Result<Option<Visitor>, AppError>;
    async fn list_visitors(&self, scope: &Scope) -> Result<Vec<Visitor>, AppError>;
    async fn insert_visitor(&self, visitor: Visitor) -> Result<Visitor, AppError>;
    async fn update_visitor(&self, visitor: Visitor) -> Result<Option<Visitor>, AppError>;
    /// Sets the status atomically. With `expected: Some(s)` the write only happens while
    /// the stored status is still `s`; otherwise `None` is returned.
    async fn set_visitor_status(
        &self,
        id: Uuid,
        status: VisitorStatus,
        expected: Option<VisitorStatus>,
    ) -> Result<Option<Visitor>, AppError>;
    async fn delete_visitor(&self, id: Uuid) -> Result<bool, AppError>;
    /// Returns `(total, pending)` for the scope.
    async fn visitor_stats(&self, scope: &Scope) -> Result<(i64, i64), AppError>;
    /// Visitors created per UTC day, ascending by date.
    async fn visitor_trend(&self, scope: &Scope) -> Result<Vec<TrendPoint>, AppError>;

    // --- Settings ---
    async fn list_settings(&self) -> Result<Vec<Setting>, AppError>;
    async fn get_setting(&self, id: Uuid) -> Result<Option<Setting>, AppError>;
    async fn insert_setting(&self, setting: Setting) -> Result<Setting, AppError>;
    async fn update_setting(&self, setting: Setting) -> Result<Option<Setting>, AppError>;
    async fn delete_setting(&self, id: Uuid) -> Result<bool, AppError>;

    // --- Access Rules ---
    async fn list_access_rules(&self) -> Result<Vec<AccessRule>, AppError>;
    async fn get_access_rule(&self, id: Uuid) -> Result<Option<AccessRule>, AppError>;
    async fn insert_access_rule(&self, rule: AccessRule) -> Result<AccessRule, AppError>;
    async fn update_access_rule(&self, rule: AccessRule) -> Result<Option<AccessRule>, AppError>;
    async fn delete_access_rule(&self, id: Uuid) -> Result<bool, AppError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Formats a sequence value as a zero-padded company code, rejecting exhaustion.
pub(crate) fn format_company_code(value: i64) -> Result<String, AppError> {
    if !(1..=MAX_COMPANY_CODE).contains(&value) {
        return Err(AppError::conflict("Company code space is exhausted"));
    }
    Ok(format!("{:03}", value))
}

pub(crate) fn duplicate_email() -> AppError {
    AppError::conflict("User already exists")
}

pub(crate) fn duplicate_company_code() -> AppError {
    AppError::conflict("Company code already in use")
}

pub(crate) fn duplicate_setting_key() -> AppError {
    AppError::conflict("Setting key already exists")
}

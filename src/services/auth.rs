use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::{hash_password, normalize_email, verify_password};
use crate::{
    auth::{AuthUser, issue_token},
    config::{AppConfig, SeedAdmin},
    error::AppError,
    models::{AuthResponse, LoginRequest, Role, User},
    repository::RepositoryState,
};

/// AuthService
///
/// Login, the current-user lookup and the startup admin seed.
pub struct AuthService {
    repo: RepositoryState,
    config: AppConfig,
}

impl AuthService {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }

    /// login
    ///
    /// Unknown email and wrong password produce the same error so the endpoint does not
    /// reveal which accounts exist.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        req.validate()?;
        let invalid = || AppError::Unauthenticated("Invalid credentials".to_string());

        let user = self
            .repo
            .find_user_by_email(&normalize_email(&req.email))
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&req.password, &user.password_hash).await? {
            tracing::info!(user_id = %user.id, "login rejected: wrong password");
            return Err(invalid());
        }

        let token = issue_token(&user, &self.config)?;
        tracing::info!(user_id = %user.id, role = %user.role, "user logged in");
        Ok(AuthResponse { token, user })
    }

    /// me
    ///
    /// The stored record behind the token. A deleted account is `Unauthenticated`.
    pub async fn me(&self, identity: &AuthUser) -> Result<User, AppError> {
        self.repo
            .get_user(identity.id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Account no longer exists".to_string()))
    }

    /// seed_admin
    ///
    /// Creates the configured administrator unless an account with that email exists.
    /// Returns the new user, or `None` when nothing had to be done.
    pub async fn seed_admin(&self, seed: &SeedAdmin) -> Result<Option<User>, AppError> {
        let email = normalize_email(&seed.email);
        if self.repo.find_user_by_email(&email).await?.is_some() {
            tracing::debug!(%email, "seed admin already present");
            return Ok(None);
        }

        let now = Utc::now();
        let admin = User {
            id: Uuid::new_v4(),
            name: seed.name.clone(),
            email,
            password_hash: hash_password(&seed.password, self.config.bcrypt_cost).await?,
            role: Role::Admin,
            company_id: None,
            created_at: now,
            updated_at: now,
        };

        let admin = self.repo.insert_user(admin).await?;
        tracing::info!(user_id = %admin.id, email = %admin.email, "seed admin created");
        Ok(Some(admin))
    }
}

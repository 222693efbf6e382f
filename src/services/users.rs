use chrono::Utc;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::{hash_password, normalize_email};
use crate::{
    auth::AuthUser,
    config::AppConfig,
    error::AppError,
    models::{CreateUserRequest, MessageResponse, Role, UpdateUserRequest, User},
    policy::{Resource, Scope, authorize, resolve_scope},
    repository::RepositoryState,
};

/// UserService
///
/// Account management. Admins manage every account; a company manages only its own
/// receptionists. Company codes are drawn from the repository's serialized counter.
pub struct UserService {
    repo: RepositoryState,
    config: AppConfig,
}

impl UserService {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }

    pub async fn list(&self, identity: &AuthUser) -> Result<Vec<User>, AppError> {
        authorize(identity, &[Role::Admin, Role::Company])?;
        let scope = resolve_scope(self.repo.as_ref(), identity, Resource::Users).await?;
        self.repo.list_users(&scope).await
    }

    /// create
    ///
    /// A company caller always creates a receptionist of its own company, whatever the
    /// body says. An admin chooses the role:
    /// - company: gets the next company code;
    /// - receptionist: `companyId` must resolve to an existing company;
    /// - admin: carries no company.
    pub async fn create(
        &self,
        identity: &AuthUser,
        req: CreateUserRequest,
    ) -> Result<User, AppError> {
        authorize(identity, &[Role::Admin, Role::Company])?;
        req.validate()?;

        let email = normalize_email(&req.email);
        if self.repo.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("User already exists"));
        }

        let (role, company_id) = if identity.role == Role::Company {
            let scope = resolve_scope(self.repo.as_ref(), identity, Resource::Users).await?;
            let own_code = scope.company_id().map(str::to_string);
            (Role::Receptionist, own_code)
        } else {
            let role = match req.role.as_deref().map(str::trim) {
                None | Some("") => {
                    return Err(AppError::Validation("Role is required".to_string()));
                }
                Some(raw) => Role::from_str(raw).map_err(AppError::Validation)?,
            };
            let company_id = match role {
                Role::Company => Some(self.repo.next_company_code().await?),
                Role::Receptionist => {
                    Some(self.company_code(req.company_id.as_deref(), None).await?)
                }
                Role::Admin => None,
            };
            (role, company_id)
        };

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            email,
            password_hash: hash_password(&req.password, self.config.bcrypt_cost).await?,
            role,
            company_id,
            created_at: now,
            updated_at: now,
        };

        let user = self.repo.insert_user(user).await?;
        if user.role == Role::Company {
            tracing::info!(
                user_id = %user.id,
                company_id = user.company_id.as_deref().unwrap_or_default(),
                "company code assigned"
            );
        }
        tracing::info!(
            user_id = %user.id,
            role = %user.role,
            created_by = %identity.id,
            "user created"
        );
        Ok(user)
    }

    /// update
    ///
    /// Partial update. Role changes re-derive the company code: promotion to company
    /// draws a fresh code, moving to receptionist needs a resolvable `companyId`, and
    /// admins carry none. A company with dependents cannot leave the company role.
    pub async fn update(
        &self,
        identity: &AuthUser,
        id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<User, AppError> {
        authorize(identity, &[Role::Admin])?;
        req.validate()?;

        let mut user = self
            .repo
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if let Some(email) = req.email.as_deref().map(normalize_email) {
            if email != user.email {
                if self.repo.find_user_by_email(&email).await?.is_some() {
                    return Err(AppError::conflict("User already exists"));
                }
                user.email = email;
            }
        }

        if let Some(name) = req.name.as_deref() {
            user.name = name.trim().to_string();
        }

        let new_role = match req.role.as_deref().map(str::trim) {
            None | Some("") => user.role,
            Some(raw) => Role::from_str(raw).map_err(AppError::Validation)?,
        };

        if user.role == Role::Company && new_role != Role::Company {
            self.ensure_no_dependents(
                &user,
                "Cannot change role of company with associated receptionists or visitors",
            )
            .await?;
        }

        // A company turning receptionist gives up its code, so it cannot own itself.
        let leaving = (user.role == Role::Company).then_some(user.id);
        user.company_id = match new_role {
            Role::Company if user.role == Role::Company => user.company_id.clone(),
            Role::Company => Some(self.repo.next_company_code().await?),
            Role::Receptionist => match req.company_id.as_deref() {
                Some(reference) => Some(self.company_code(Some(reference), leaving).await?),
                None if user.role == Role::Receptionist => user.company_id.clone(),
                None => Some(self.company_code(None, leaving).await?),
            },
            Role::Admin => None,
        };
        user.role = new_role;

        if let Some(password) = req.password.as_deref() {
            user.password_hash = hash_password(password, self.config.bcrypt_cost).await?;
        }
        user.updated_at = Utc::now();

        let user = self
            .repo
            .update_user(user)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        tracing::info!(user_id = %user.id, role = %user.role, "user updated");
        Ok(user)
    }

    /// delete
    ///
    /// Companies that still own receptionists or visitors are kept; the conflict carries
    /// both counts.
    pub async fn delete(&self, identity: &AuthUser, id: Uuid) -> Result<MessageResponse, AppError> {
        authorize(identity, &[Role::Admin])?;

        let user = self
            .repo
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if user.role == Role::Company {
            self.ensure_no_dependents(
                &user,
                "Cannot delete company with associated receptionists or visitors",
            )
            .await?;
        }

        if !self.repo.delete_user(id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        tracing::info!(user_id = %id, deleted_by = %identity.id, "user deleted");
        Ok(MessageResponse::new("User deleted"))
    }

    /// Resolves a company reference (id or code) to the company's code. `leaving` names
    /// a company account that no longer counts as one.
    async fn company_code(
        &self,
        reference: Option<&str>,
        leaving: Option<Uuid>,
    ) -> Result<String, AppError> {
        let reference = reference
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                AppError::Validation("Company ID is required for receptionists".to_string())
            })?;

        self.repo
            .find_company(reference)
            .await?
            .filter(|company| Some(company.id) != leaving)
            .and_then(|company| company.company_id)
            .ok_or_else(|| AppError::Validation("Company not found".to_string()))
    }

    async fn ensure_no_dependents(&self, company: &User, message: &str) -> Result<(), AppError> {
        let Some(code) = company.company_id.as_deref() else {
            return Ok(());
        };

        let receptionists = self
            .repo
            .count_users(&Scope::company(code).with_role(Role::Receptionist))
            .await?;
        let (visitors, _) = self.repo.visitor_stats(&Scope::company(code)).await?;

        if receptionists > 0 || visitors > 0 {
            tracing::info!(company_id = code, receptionists, visitors, "company has dependents");
            return Err(AppError::Conflict {
                message: message.to_string(),
                details: Some(json!({ "receptionists": receptionists, "visitors": visitors })),
            });
        }
        Ok(())
    }
}

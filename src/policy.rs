//! Role policy and record scoping.
//!
//! Two decisions live here and nowhere else:
//! - `authorize` gates an operation by role;
//! - `resolve_scope` decides which records of a resource the caller may see.
//!
//! Every service calls both, and `Scope::admits` is the single visibility predicate
//! shared by the stores (list/count filters) and the services (single-record checks).

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{Role, User, Visitor},
    repository::Repository,
};

/// authorize
///
/// Admins are always admitted. Anyone else is admitted iff `required` is empty or
/// contains their role.
pub fn authorize(identity: &AuthUser, required: &[Role]) -> Result<(), AppError> {
    if identity.role == Role::Admin || required.is_empty() || required.contains(&identity.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Access denied".to_string()))
    }
}

/// Resource
///
/// The record families a scope can be resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Users,
    Visitors,
    Analytics,
    Settings,
    AccessRules,
}

/// Scope
///
/// A filter over tenant-owned records. `company_id: None` means every company;
/// `role: Some(_)` further restricts user records to that role.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scope {
    company_id: Option<String>,
    role: Option<Role>,
}

impl Scope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn company(company_id: impl Into<String>) -> Self {
        Self {
            company_id: Some(company_id.into()),
            role: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn company_id(&self) -> Option<&str> {
        self.company_id.as_deref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// admits
    ///
    /// True when the record belongs to the scoped company (if any) and, for scopes with a
    /// role restriction, carries that role.
    pub fn admits<T: Tenanted + ?Sized>(&self, record: &T) -> bool {
        let company_ok = match &self.company_id {
            None => true,
            Some(id) => record.tenant_id() == Some(id.as_str()),
        };
        let role_ok = match self.role {
            None => true,
            Some(role) => record.tenant_role() == Some(role),
        };
        company_ok && role_ok
    }
}

/// Tenanted
///
/// Records that belong to a company through a company code.
pub trait Tenanted {
    fn tenant_id(&self) -> Option<&str>;

    fn tenant_role(&self) -> Option<Role> {
        None
    }
}

impl Tenanted for User {
    fn tenant_id(&self) -> Option<&str> {
        self.company_id.as_deref()
    }

    fn tenant_role(&self) -> Option<Role> {
        Some(self.role)
    }
}

impl Tenanted for Visitor {
    fn tenant_id(&self) -> Option<&str> {
        Some(self.company_id.as_str())
    }
}

/// Identifies a company by code alone, e.g. for `/visitors/company/{companyId}`.
impl Tenanted for str {
    fn tenant_id(&self) -> Option<&str> {
        Some(self)
    }
}

/// resolve_scope
///
/// The shared scoping rule:
/// - admin sees everything;
/// - company sees records carrying its own company code;
/// - receptionist sees records carrying its owning company's code, read from its stored
///   user record rather than the token.
///
/// For `Resource::Users` the non-admin scope is further narrowed to receptionists.
/// Settings and access rules are admin-only.
pub async fn resolve_scope(
    repo: &dyn Repository,
    identity: &AuthUser,
    resource: Resource,
) -> Result<Scope, AppError> {
    if identity.role == Role::Admin {
        return Ok(Scope::all());
    }

    if matches!(resource, Resource::Settings | Resource::AccessRules) {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let company_id = match identity.role {
        Role::Company => identity.company_id.clone(),
        Role::Receptionist => {
            let own = repo.get_user(identity.id).await?.ok_or_else(|| {
                AppError::Unauthenticated("Account no longer exists".to_string())
            })?;
            own.company_id
        }
        Role::Admin => None,
    };

    let company_id = company_id.ok_or_else(|| {
        AppError::Forbidden("Account is not attached to a company".to_string())
    })?;

    let scope = Scope::company(company_id);
    Ok(match resource {
        Resource::Users => scope.with_role(Role::Receptionist),
        _ => scope,
    })
}

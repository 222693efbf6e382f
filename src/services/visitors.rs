use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{
        CreateVisitorRequest, MessageResponse, Role, UpdateVisitorRequest, Visitor, VisitorStatus,
    },
    policy::{Resource, Scope, authorize, resolve_scope},
    repository::RepositoryState,
};

/// VisitorService
///
/// Visitor requests, always filtered through the caller's Visitors scope. A visitor
/// outside the scope is reported as missing rather than forbidden.
pub struct VisitorService {
    repo: RepositoryState,
}

impl VisitorService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    async fn scope(&self, identity: &AuthUser) -> Result<Scope, AppError> {
        resolve_scope(self.repo.as_ref(), identity, Resource::Visitors).await
    }

    /// Loads a visitor the caller may see.
    async fn visible(&self, scope: &Scope, id: Uuid) -> Result<Visitor, AppError> {
        self.repo
            .get_visitor(id)
            .await?
            .filter(|v| scope.admits(v))
            .ok_or_else(|| AppError::NotFound("Visitor not found".to_string()))
    }

    pub async fn list(&self, identity: &AuthUser) -> Result<Vec<Visitor>, AppError> {
        authorize(identity, &[])?;
        let scope = self.scope(identity).await?;
        self.repo.list_visitors(&scope).await
    }

    /// list_for_company
    ///
    /// `reference` is a company id or code. It must resolve to a company, and that
    /// company must fall inside the caller's scope.
    pub async fn list_for_company(
        &self,
        identity: &AuthUser,
        reference: &str,
    ) -> Result<Vec<Visitor>, AppError> {
        authorize(identity, &[Role::Company, Role::Receptionist])?;
        let scope = self.scope(identity).await?;

        let code = self
            .repo
            .find_company(reference.trim())
            .await?
            .and_then(|company| company.company_id)
            .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

        if !scope.admits(code.as_str()) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
        self.repo.list_visitors(&Scope::company(code)).await
    }

    /// create
    ///
    /// Receptionists register visitors for their own company only; `companyId` may be
    /// omitted and then defaults to it. Admins must name the company.
    pub async fn create(
        &self,
        identity: &AuthUser,
        req: CreateVisitorRequest,
    ) -> Result<Visitor, AppError> {
        authorize(identity, &[Role::Admin, Role::Receptionist])?;
        req.validate()?;
        let scope = self.scope(identity).await?;

        let reference = req
            .company_id
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .or_else(|| scope.company_id().map(str::to_string))
            .ok_or_else(|| AppError::Validation("Company ID is required".to_string()))?;

        let code = self
            .repo
            .find_company(&reference)
            .await?
            .and_then(|company| company.company_id)
            .ok_or_else(|| AppError::Validation("Company not found".to_string()))?;

        if !scope.admits(code.as_str()) {
            return Err(AppError::Forbidden(
                "You can only register visitors for your own company".to_string(),
            ));
        }

        let now = Utc::now();
        let visitor = Visitor {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            email: req.email.trim().to_string(),
            phone: req.phone.trim().to_string(),
            company_id: code,
            status: req.status.unwrap_or_default(),
            contact_email: req
                .contact_email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            created_at: now,
            updated_at: now,
        };

        let visitor = self.repo.insert_visitor(visitor).await?;
        tracing::info!(
            visitor_id = %visitor.id,
            company_id = %visitor.company_id,
            created_by = %identity.id,
            "visitor created"
        );
        Ok(visitor)
    }

    /// Partial update of the contact details. Status has its own operation.
    pub async fn update(
        &self,
        identity: &AuthUser,
        id: Uuid,
        req: UpdateVisitorRequest,
    ) -> Result<Visitor, AppError> {
        authorize(identity, &[])?;
        req.validate()?;
        let scope = self.scope(identity).await?;
        let mut visitor = self.visible(&scope, id).await?;

        if let Some(name) = req.name.filter(|n| !n.trim().is_empty()) {
            visitor.name = name.trim().to_string();
        }
        if let Some(email) = req.email {
            visitor.email = email.trim().to_string();
        }
        if let Some(phone) = req.phone.filter(|p| !p.trim().is_empty()) {
            visitor.phone = phone.trim().to_string();
        }
        // A blank contact clears it.
        if let Some(contact) = req.contact_email {
            visitor.contact_email = Some(contact.trim().to_string()).filter(|c| !c.is_empty());
        }
        visitor.updated_at = Utc::now();

        self.repo
            .update_visitor(visitor)
            .await?
            .ok_or_else(|| AppError::NotFound("Visitor not found".to_string()))
    }

    /// update_status
    ///
    /// Any status may follow any other here; only decision links are single-use.
    pub async fn update_status(
        &self,
        identity: &AuthUser,
        id: Uuid,
        status: VisitorStatus,
    ) -> Result<Visitor, AppError> {
        authorize(identity, &[Role::Company])?;
        let scope = self.scope(identity).await?;
        self.visible(&scope, id).await?;

        let visitor = self
            .repo
            .set_visitor_status(id, status, None)
            .await?
            .ok_or_else(|| AppError::NotFound("Visitor not found".to_string()))?;
        tracing::info!(
            visitor_id = %id,
            status = status.as_str(),
            changed_by = %identity.id,
            "visitor status changed"
        );
        Ok(visitor)
    }

    pub async fn delete(&self, identity: &AuthUser, id: Uuid) -> Result<MessageResponse, AppError> {
        authorize(identity, &[])?;
        let scope = self.scope(identity).await?;
        self.visible(&scope, id).await?;

        if !self.repo.delete_visitor(id).await? {
            return Err(AppError::NotFound("Visitor not found".to_string()));
        }
        tracing::info!(visitor_id = %id, deleted_by = %identity.id, "visitor deleted");
        Ok(MessageResponse::new("Visitor deleted"))
    }
}

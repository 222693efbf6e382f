use chrono::Utc;
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{AccessRule, AccessRuleRequest, Action, MessageResponse, Role},
    policy::{Resource, resolve_scope},
    repository::RepositoryState,
};

/// AccessRuleService
///
/// Page-level permissions per role. Admin-only, like settings.
pub struct AccessRuleService {
    repo: RepositoryState,
}

/// A validated rule body.
#[derive(Debug, PartialEq)]
pub struct RuleFields {
    pub role: Role,
    pub resource: String,
    pub actions: Vec<Action>,
}

/// parse_rule
///
/// Checks role, resource and actions. Every unknown action is reported by name;
/// repeated actions collapse to one, keeping first-seen order.
pub fn parse_rule(req: &AccessRuleRequest) -> Result<RuleFields, AppError> {
    let role = Role::from_str(&req.role).map_err(AppError::Validation)?;

    let resource = req.resource.trim();
    if resource.is_empty() {
        return Err(AppError::Validation("Resource is required".to_string()));
    }
    if req.actions.is_empty() {
        return Err(AppError::Validation(
            "At least one action is required".to_string(),
        ));
    }

    let mut actions = Vec::new();
    let mut invalid = Vec::new();
    for raw in &req.actions {
        match Action::from_str(raw.trim()) {
            Ok(action) if !actions.contains(&action) => actions.push(action),
            Ok(_) => {}
            Err(name) => invalid.push(name),
        }
    }
    if !invalid.is_empty() {
        return Err(AppError::Validation(format!(
            "Invalid actions: {}",
            invalid.join(", ")
        )));
    }

    Ok(RuleFields {
        role,
        resource: resource.to_string(),
        actions,
    })
}

impl AccessRuleService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    async fn admit(&self, identity: &AuthUser) -> Result<(), AppError> {
        resolve_scope(self.repo.as_ref(), identity, Resource::AccessRules).await?;
        Ok(())
    }

    pub async fn list(&self, identity: &AuthUser) -> Result<Vec<AccessRule>, AppError> {
        self.admit(identity).await?;
        self.repo.list_access_rules().await
    }

    pub async fn create(
        &self,
        identity: &AuthUser,
        req: AccessRuleRequest,
    ) -> Result<AccessRule, AppError> {
        self.admit(identity).await?;
        let fields = parse_rule(&req)?;

        let now = Utc::now();
        let rule = self
            .repo
            .insert_access_rule(AccessRule {
                id: Uuid::new_v4(),
                role: fields.role,
                resource: fields.resource,
                actions: fields.actions,
                created_at: now,
                updated_at: now,
            })
            .await?;
        tracing::info!(
            rule_id = %rule.id,
            role = %rule.role,
            resource = %rule.resource,
            "access rule created"
        );
        Ok(rule)
    }

    /// Replaces role, resource and actions of an existing rule.
    pub async fn update(
        &self,
        identity: &AuthUser,
        id: Uuid,
        req: AccessRuleRequest,
    ) -> Result<AccessRule, AppError> {
        self.admit(identity).await?;
        let fields = parse_rule(&req)?;

        let mut rule = self
            .repo
            .get_access_rule(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Access rule not found".to_string()))?;
        rule.role = fields.role;
        rule.resource = fields.resource;
        rule.actions = fields.actions;
        rule.updated_at = Utc::now();

        self.repo
            .update_access_rule(rule)
            .await?
            .ok_or_else(|| AppError::NotFound("Access rule not found".to_string()))
    }

    pub async fn delete(&self, identity: &AuthUser, id: Uuid) -> Result<MessageResponse, AppError> {
        self.admit(identity).await?;
        if !self.repo.delete_access_rule(id).await? {
            return Err(AppError::NotFound("Access rule not found".to_string()));
        }
        Ok(MessageResponse::new("Access rule deleted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: &str, resource: &str, actions: &[&str]) -> AccessRuleRequest {
        AccessRuleRequest {
            role: role.to_string(),
            resource: resource.to_string(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn duplicates_collapse_in_order() {
        let fields =
            parse_rule(&request("company", "Visitors", &["write", "read", "write"])).unwrap();
        assert_eq!(fields.actions, vec![Action::Write, Action::Read]);
        assert_eq!(fields.role, Role::Company);
    }

    #[test]
    fn unknown_actions_are_named() {
        let err = parse_rule(&request("admin", "Users", &["read", "fly", "swim"])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid actions: fly, swim");
    }

    #[test]
    fn empty_fields_are_rejected() {
        assert!(parse_rule(&request("admin", "  ", &["read"])).is_err());
        assert!(parse_rule(&request("admin", "Users", &[])).is_err());
        let err = parse_rule(&request("guest", "Users", &["read"])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid role: guest");
    }
}

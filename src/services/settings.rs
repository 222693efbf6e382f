use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{CreateSettingRequest, MessageResponse, Setting, UpdateSettingRequest},
    policy::{Resource, resolve_scope},
    repository::RepositoryState,
};

/// SettingsService
///
/// Global key/value settings. Admin-only: the Settings scope refuses everyone else.
pub struct SettingsService {
    repo: RepositoryState,
}

impl SettingsService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    async fn admit(&self, identity: &AuthUser) -> Result<(), AppError> {
        resolve_scope(self.repo.as_ref(), identity, Resource::Settings).await?;
        Ok(())
    }

    pub async fn list(&self, identity: &AuthUser) -> Result<Vec<Setting>, AppError> {
        self.admit(identity).await?;
        self.repo.list_settings().await
    }

    pub async fn create(
        &self,
        identity: &AuthUser,
        req: CreateSettingRequest,
    ) -> Result<Setting, AppError> {
        self.admit(identity).await?;
        req.validate()?;

        let key = req.key.trim();
        let value = req.value.trim();
        let now = Utc::now();
        let setting = self
            .repo
            .insert_setting(Setting {
                id: Uuid::new_v4(),
                key: key.to_string(),
                value: value.to_string(),
                created_at: now,
                updated_at: now,
            })
            .await?;
        tracing::info!(setting_id = %setting.id, key = %setting.key, "setting created");
        Ok(setting)
    }

    /// Partial update; a new key must still be unique.
    pub async fn update(
        &self,
        identity: &AuthUser,
        id: Uuid,
        req: UpdateSettingRequest,
    ) -> Result<Setting, AppError> {
        self.admit(identity).await?;
        req.validate()?;

        let mut setting = self
            .repo
            .get_setting(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Setting not found".to_string()))?;

        if let Some(key) = req.key {
            setting.key = key.trim().to_string();
        }
        if let Some(value) = req.value {
            setting.value = value.trim().to_string();
        }
        setting.updated_at = Utc::now();

        self.repo
            .update_setting(setting)
            .await?
            .ok_or_else(|| AppError::NotFound("Setting not found".to_string()))
    }

    pub async fn delete(&self, identity: &AuthUser, id: Uuid) -> Result<MessageResponse, AppError> {
        self.admit(identity).await?;
        if !self.repo.delete_setting(id).await? {
            return Err(AppError::NotFound("Setting not found".to_string()));
        }
        Ok(MessageResponse::new("Setting deleted"))
    }
}

//! In-memory implementation of the `Repository`.
//!
//! All state sits behind one tokio `Mutex`, so every method is atomic with respect to
//! the others. Used by the test-suite and by local runs without `DATABASE_URL`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    Repository, duplicate_company_code, duplicate_email, duplicate_setting_key,
    format_company_code,
};
use crate::{
    error::AppError,
    models::{AccessRule, Role, Setting, TrendPoint, User, Visitor, VisitorStatus},
    policy::Scope,
};

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    visitors: Vec<Visitor>,
    settings: Vec<Setting>,
    access_rules: Vec<AccessRule>,
    // Last company code handed out. Never decreases.
    last_company_code: i64,
}

#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn company_code_value(user: &User) -> Option<i64> {
    if user.role != Role::Company {
        return None;
    }
    user.company_id.as_deref().and_then(|code| code.parse().ok())
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_company(&self, reference: &str) -> Result<Option<User>, AppError> {
        let state = self.state.lock().await;
        let by_id = Uuid::parse_str(reference).ok();
        Ok(state
            .users
            .iter()
            .filter(|u| u.role == Role::Company)
            .find(|u| Some(u.id) == by_id || u.company_id.as_deref() == Some(reference))
            .cloned())
    }

    async fn list_users(&self, scope: &Scope) -> Result<Vec<User>, AppError> {
        let state = self.state.lock().await;
        let mut users: Vec<User> = state
            .users
            .iter()
            .filter(|u| scope.admits(*u))
            .cloned()
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn count_users(&self, scope: &Scope) -> Result<i64, AppError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().filter(|u| scope.admits(*u)).count() as i64)
    }

    async fn insert_user(&self, user: User) -> Result<User, AppError> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(duplicate_email());
        }
        if user.role == Role::Company
            && state
                .users
                .iter()
                .any(|u| u.role == Role::Company && u.company_id == user.company_id)
        {
            return Err(duplicate_company_code());
        }
        // Keep the counter past any code that did not come from it.
        if let Some(value) = company_code_value(&user) {
            state.last_company_code = state.last_company_code.max(value);
        }
        state.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> Result<Option<User>, AppError> {
        let mut state = self.state.lock().await;
        if state
            .users
            .iter()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(duplicate_email());
        }
        if user.role == Role::Company
            && state.users.iter().any(|u| {
                u.id != user.id && u.role == Role::Company && u.company_id == user.company_id
            })
        {
            return Err(duplicate_company_code());
        }
        if let Some(value) = company_code_value(&user) {
            state.last_company_code = state.last_company_code.max(value);
        }
        match state.users.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        Ok(state.users.len() != before)
    }

    async fn next_company_code(&self) -> Result<String, AppError> {
        let mut state = self.state.lock().await;
        let code = format_company_code(state.last_company_code + 1)?;
        state.last_company_code += 1;
        Ok(code)
    }

    async fn get_visitor(&self, id: Uuid) -> Result<Option<Visitor>, AppError> {
        let state = self.state.lock().await;
        Ok(state.visitors.iter().find(|v| v.id == id).cloned())
    }

    async fn list_visitors(&self, scope: &Scope) -> Result<Vec<Visitor>, AppError> {
        let state = self.state.lock().await;
        let mut visitors: Vec<Visitor> = state
            .visitors
            .iter()
            .filter(|v| scope.admits(*v))
            .cloned()
            .collect();
        // Newest first.
        visitors.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(visitors)
    }

    async fn insert_visitor(&self, visitor: Visitor) -> Result<Visitor, AppError> {
        let mut state = self.state.lock().await;
        state.visitors.push(visitor.clone());
        Ok(visitor)
    }

    async fn update_visitor(&self, visitor: Visitor) -> Result<Option<Visitor>, AppError> {
        let mut state = self.state.lock().await;
        match state.visitors.iter_mut().find(|v| v.id == visitor.id) {
            Some(slot) => {
                *slot = visitor.clone();
                Ok(Some(visitor))
            }
            None => Ok(None),
        }
    }

    async fn set_visitor_status(
        &self,
        id: Uuid,
        status: VisitorStatus,
        expected: Option<VisitorStatus>,
    ) -> Result<Option<Visitor>, AppError> {
        let mut state = self.state.lock().await;
        let Some(visitor) = state.visitors.iter_mut().find(|v| v.id == id) else {
            return Ok(None);
        };
        if expected.is_some_and(|expected| visitor.status != expected) {
            return Ok(None);
        }
        visitor.status = status;
        visitor.updated_at = Utc::now();
        Ok(Some(visitor.clone()))
    }

    async fn delete_visitor(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        let before = state.visitors.len();
        state.visitors.retain(|v| v.id != id);
        Ok(state.visitors.len() != before)
    }

    async fn visitor_stats(&self, scope: &Scope) -> Result<(i64, i64), AppError> {
        let state = self.state.lock().await;
        let (total, pending) = state
            .visitors
            .iter()
            .filter(|v| scope.admits(*v))
            .fold((0, 0), |(total, pending), v| {
                let pending = pending + i64::from(v.status == VisitorStatus::Pending);
                (total + 1, pending)
            });
        Ok((total, pending))
    }

    async fn visitor_trend(&self, scope: &Scope) -> Result<Vec<TrendPoint>, AppError> {
        let state = self.state.lock().await;
        let mut per_day: BTreeMap<String, i64> = BTreeMap::new();
        for visitor in state.visitors.iter().filter(|v| scope.admits(*v)) {
            *per_day
                .entry(visitor.created_at.format("%Y-%m-%d").to_string())
                .or_default() += 1;
        }
        Ok(per_day
            .into_iter()
            .map(|(date, count)| TrendPoint { date, count })
            .collect())
    }

    async fn list_settings(&self) -> Result<Vec<Setting>, AppError> {
        let state = self.state.lock().await;
        let mut settings = state.settings.clone();
        settings.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(settings)
    }

    async fn get_setting(&self, id: Uuid) -> Result<Option<Setting>, AppError> {
        let state = self.state.lock().await;
        Ok(state.settings.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_setting(&self, setting: Setting) -> Result<Setting, AppError> {
        let mut state = self.state.lock().await;
        if state.settings.iter().any(|s| s.key == setting.key) {
            return Err(duplicate_setting_key());
        }
        state.settings.push(setting.clone());
        Ok(setting)
    }

    async fn update_setting(&self, setting: Setting) -> Result<Option<Setting>, AppError> {
        let mut state = self.state.lock().await;
        if state
            .settings
            .iter()
            .any(|s| s.id != setting.id && s.key == setting.key)
        {
            return Err(duplicate_setting_key());
        }
        match state.settings.iter_mut().find(|s| s.id == setting.id) {
            Some(slot) => {
                *slot = setting.clone();
                Ok(Some(setting))
            }
            None => Ok(None),
        }
    }

    async fn delete_setting(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        let before = state.settings.len();
        state.settings.retain(|s| s.id != id);
        Ok(state.settings.len() != before)
    }

    async fn list_access_rules(&self) -> Result<Vec<AccessRule>, AppError> {
        let state = self.state.lock().await;
        let mut rules = state.access_rules.clone();
        rules.sort_by(|a, b| {
            (a.role.as_str(), &a.resource).cmp(&(b.role.as_str(), &b.resource))
        });
        Ok(rules)
    }

    async fn get_access_rule(&self, id: Uuid) -> Result<Option<AccessRule>, AppError> {
        let state = self.state.lock().await;
        Ok(state.access_rules.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_access_rule(&self, rule: AccessRule) -> Result<AccessRule, AppError> {
        let mut state = self.state.lock().await;
        state.access_rules.push(rule.clone());
        Ok(rule)
    }

    async fn update_access_rule(&self, rule: AccessRule) -> Result<Option<AccessRule>, AppError> {
        let mut state = self.state.lock().await;
        match state.access_rules.iter_mut().find(|r| r.id == rule.id) {
            Some(slot) => {
                *slot = rule.clone();
                Ok(Some(rule))
            }
            None => Ok(None),
        }
    }

    async fn delete_access_rule(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        let before = state.access_rules.len();
        state.access_rules.retain(|r| r.id != id);
        Ok(state.access_rules.len() != before)
    }
}

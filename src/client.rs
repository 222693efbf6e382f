//! Typed HTTP client for the `/api` surface.
//!
//! Holds the logged-in session the way the dashboard keeps it in local storage,
//! attaches the bearer token to every call and drops the session as soon as the
//! server answers 401.

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{
    path::Path,
    sync::{Arc, RwLock},
};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AccessRule, AccessRuleRequest, AnalyticsStats, AuthResponse, CreateSettingRequest,
    CreateUserRequest, CreateVisitorRequest, LoginRequest, MessageResponse, NotifyVisitorRequest,
    Role, Setting, TrendPoint, UpdateSettingRequest, UpdateUserRequest, UpdateVisitorRequest,
    UpdateVisitorStatusRequest, User, Visitor, VisitorStatus,
};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected the session. The stored session has been cleared.
    #[error("{0}")]
    Unauthenticated(String),

    /// Any other non-2xx answer, carrying the server's `message` verbatim.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        details: Option<Value>,
    },

    #[error("Not logged in")]
    NoSession,

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    details: Option<Value>,
}

/// Session
///
/// What a successful login leaves behind: the bearer token and the user it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ClientError> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// NavItem
///
/// One sidebar entry of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
}

const fn item(label: &'static str, path: &'static str) -> NavItem {
    NavItem { label, path }
}

/// navigation
///
/// Sidebar entries for a role, in display order. Companies see their receptionists
/// under `/users`.
pub fn navigation(role: Role) -> Vec<NavItem> {
    let mut items = vec![item("Dashboard", "/dashboard")];

    match role {
        Role::Admin => {
            items.push(item("Users", "/users"));
            items.push(item("Access Control", "/access-control"));
        }
        Role::Company => items.push(item("Receptionists", "/users")),
        Role::Receptionist => {}
    }

    items.push(item("Visitors", "/visitors"));
    items.push(item("Analytics", "/analytics"));

    if role == Role::Admin {
        items.push(item("Settings", "/settings"));
    }

    items
}

/// landing_path
///
/// Where the root URL sends the user.
pub fn landing_path(session: Option<&Session>) -> &'static str {
    match session {
        Some(_) => "/dashboard",
        None => "/login",
    }
}

/// ApiClient
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<RwLock<Option<Session>>>,
}

impl ApiClient {
    /// `base_url` is the server origin, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_session(base_url: impl Into<String>, session: Session) -> Self {
        let client = Self::new(base_url);
        client.set_session(Some(session));
        client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> Option<Session> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.session().is_some()
    }

    fn set_session(&self, session: Option<Session>) {
        let mut guard = match self.session.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = session;
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = self.session().ok_or(ClientError::NoSession)?.token;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    /// Sends the request and decodes a 2xx JSON body. A 401 clears the session.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.json::<ErrorBody>().await.ok();
        let (message, details) = match body {
            Some(body) => (body.message, body.details),
            None => (
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string(),
                None,
            ),
        };

        if status == StatusCode::UNAUTHORIZED {
            tracing::debug!(%message, "session rejected by server, clearing it");
            self.set_session(None);
            return Err(ClientError::Unauthenticated(message));
        }

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
            details,
        })
    }

    // --- Session ---

    pub async fn health(&self) -> Result<String, ClientError> {
        let response = self.http.get(self.url("/health")).send().await?;
        Ok(response.error_for_status()?.text().await?)
    }

    /// login
    ///
    /// Stores the returned session on success. A failed login leaves any previous
    /// session untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let payload = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self.http.post(self.url("/auth/login")).json(&payload);
        let response: AuthResponse = self.send(request).await?;

        let session = Session {
            token: response.token,
            user: response.user,
        };
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    pub fn logout(&self) {
        self.set_session(None);
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        self.send(self.authorized(Method::GET, "/auth/me")?).await
    }

    // --- Users ---

    pub async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        self.send(self.authorized(Method::GET, "/users")?).await
    }

    pub async fn create_user(&self, req: &CreateUserRequest) -> Result<User, ClientError> {
        self.send(self.authorized(Method::POST, "/users")?.json(req))
            .await
    }

    pub async fn update_user(
        &self,
        id: Uuid,
        req: &UpdateUserRequest,
    ) -> Result<User, ClientError> {
        let path = format!("/users/{}", id);
        self.send(self.authorized(Method::PUT, &path)?.json(req))
            .await
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<MessageResponse, ClientError> {
        let path = format!("/users/{}", id);
        self.send(self.authorized(Method::DELETE, &path)?).await
    }

    // --- Visitors ---

    pub async fn list_visitors(&self) -> Result<Vec<Visitor>, ClientError> {
        self.send(self.authorized(Method::GET, "/visitors")?).await
    }

    /// `company` is a company user id or its 3-digit code.
    pub async fn company_visitors(&self, company: &str) -> Result<Vec<Visitor>, ClientError> {
        let path = format!("/visitors/company/{}", company);
        self.send(self.authorized(Method::GET, &path)?).await
    }

    pub async fn create_visitor(&self, req: &CreateVisitorRequest) -> Result<Visitor, ClientError> {
        self.send(self.authorized(Method::POST, "/visitors")?.json(req))
            .await
    }

    pub async fn update_visitor(
        &self,
        id: Uuid,
        req: &UpdateVisitorRequest,
    ) -> Result<Visitor, ClientError> {
        let path = format!("/visitors/{}", id);
        self.send(self.authorized(Method::PUT, &path)?.json(req))
            .await
    }

    pub async fn set_visitor_status(
        &self,
        id: Uuid,
        status: VisitorStatus,
    ) -> Result<Visitor, ClientError> {
        let path = format!("/visitors/{}/status", id);
        let body = UpdateVisitorStatusRequest { status };
        self.send(self.authorized(Method::PUT, &path)?.json(&body))
            .await
    }

    pub async fn delete_visitor(&self, id: Uuid) -> Result<MessageResponse, ClientError> {
        let path = format!("/visitors/{}", id);
        self.send(self.authorized(Method::DELETE, &path)?).await
    }

    pub async fn notify_visitor(
        &self,
        visitor_id: Uuid,
        contact_email: Option<&str>,
    ) -> Result<MessageResponse, ClientError> {
        let body = NotifyVisitorRequest {
            visitor_id,
            contact_email: contact_email.map(str::to_string),
        };
        self.send(self.authorized(Method::POST, "/visitors/notify")?.json(&body))
            .await
    }

    // --- Analytics ---

    pub async fn stats(&self) -> Result<AnalyticsStats, ClientError> {
        self.send(self.authorized(Method::GET, "/analytics/stats")?)
            .await
    }

    pub async fn visitor_trend(&self) -> Result<Vec<TrendPoint>, ClientError> {
        self.send(self.authorized(Method::GET, "/analytics/visitors/trend")?)
            .await
    }

    // --- Settings ---

    pub async fn list_settings(&self) -> Result<Vec<Setting>, ClientError> {
        self.send(self.authorized(Method::GET, "/settings")?).await
    }

    pub async fn create_setting(&self, key: &str, value: &str) -> Result<Setting, ClientError> {
        let body = CreateSettingRequest {
            key: key.to_string(),
            value: value.to_string(),
        };
        self.send(self.authorized(Method::POST, "/settings")?.json(&body))
            .await
    }

    pub async fn update_setting(
        &self,
        id: Uuid,
        req: &UpdateSettingRequest,
    ) -> Result<Setting, ClientError> {
        let path = format!("/settings/{}", id);
        self.send(self.authorized(Method::PUT, &path)?.json(req))
            .await
    }

    pub async fn delete_setting(&self, id: Uuid) -> Result<MessageResponse, ClientError> {
        let path = format!("/settings/{}", id);
        self.send(self.authorized(Method::DELETE, &path)?).await
    }

    // --- Access Control ---

    pub async fn list_access_rules(&self) -> Result<Vec<AccessRule>, ClientError> {
        self.send(self.authorized(Method::GET, "/access-control")?)
            .await
    }

    pub async fn create_access_rule(
        &self,
        req: &AccessRuleRequest,
    ) -> Result<AccessRule, ClientError> {
        self.send(self.authorized(Method::POST, "/access-control")?.json(req))
            .await
    }

    pub async fn update_access_rule(
        &self,
        id: Uuid,
        req: &AccessRuleRequest,
    ) -> Result<AccessRule, ClientError> {
        let path = format!("/access-control/{}", id);
        self.send(self.authorized(Method::PUT, &path)?.json(req))
            .await
    }

    pub async fn delete_access_rule(&self, id: Uuid) -> Result<MessageResponse, ClientError> {
        let path = format!("/access-control/{}", id);
        self.send(self.authorized(Method::DELETE, &path)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(role: Role) -> Vec<&'static str> {
        navigation(role).into_iter().map(|i| i.label).collect()
    }

    #[test]
    fn admin_sees_every_page() {
        assert_eq!(
            labels(Role::Admin),
            vec![
                "Dashboard",
                "Users",
                "Access Control",
                "Visitors",
                "Analytics",
                "Settings"
            ]
        );
    }

    #[test]
    fn company_manages_receptionists_under_users() {
        let items = navigation(Role::Company);
        assert_eq!(
            labels(Role::Company),
            vec!["Dashboard", "Receptionists", "Visitors", "Analytics"]
        );
        assert!(items.contains(&NavItem {
            label: "Receptionists",
            path: "/users"
        }));
    }

    #[test]
    fn receptionist_gets_the_common_pages_only() {
        assert_eq!(
            labels(Role::Receptionist),
            vec!["Dashboard", "Visitors", "Analytics"]
        );
    }

    #[test]
    fn landing_depends_on_session() {
        let session = Session {
            token: "t".into(),
            user: User::default(),
        };
        assert_eq!(landing_path(Some(&session)), "/dashboard");
        assert_eq!(landing_path(None), "/login");
    }

    #[test]
    fn session_survives_a_save_and_load() {
        let path = std::env::temp_dir().join(format!("vms-session-{}.json", Uuid::new_v4()));
        let session = Session {
            token: "abc".into(),
            user: User {
                name: "Acme".into(),
                role: Role::Company,
                company_id: Some("001".into()),
                ..Default::default()
            },
        };

        session.save(&path).unwrap();
        let loaded = Session::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.token, "abc");
        assert_eq!(loaded.user.company_id.as_deref(), Some("001"));
        assert_eq!(loaded.user.role, Role::Company);
    }
}

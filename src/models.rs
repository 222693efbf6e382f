use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError};

// --- Enumerations ---

/// Role
///
/// The three account kinds. Admins manage everything, companies manage their own
/// receptionists and review visitors, receptionists register visitors for their company.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Company,
    #[default]
    Receptionist,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Company => "company",
            Role::Receptionist => "receptionist",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Case-insensitive, so "Company" from a form select is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "company" => Ok(Role::Company),
            "receptionist" => Ok(Role::Receptionist),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

/// VisitorStatus
///
/// Lifecycle of a visitor request. Every visitor starts as `pending`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum VisitorStatus {
    #[default]
    Pending,
    Allowed,
    Rejected,
}

impl VisitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitorStatus::Pending => "pending",
            VisitorStatus::Allowed => "allowed",
            VisitorStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for VisitorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VisitorStatus::Pending),
            "allowed" => Ok(VisitorStatus::Allowed),
            "rejected" => Ok(VisitorStatus::Rejected),
            other => Err(format!("Invalid visitor status: {}", other)),
        }
    }
}

/// Action
///
/// Page-level permission verbs stored on access rules.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Action {
    Read,
    Write,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Action::Read),
            "write" => Ok(Action::Write),
            "delete" => Ok(Action::Delete),
            other => Err(other.to_string()),
        }
    }
}

// --- Stored Records ---

/// User
///
/// An account of any role. For companies `company_id` holds the 3-digit company code
/// ("001"); for receptionists it holds the code of the owning company; admins have none.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    // Never leaves the server.
    #[serde(default, skip_serializing)]
    #[ts(skip)]
    #[schema(ignore)]
    pub password_hash: String,
    pub role: Role,
    pub company_id: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Visitor
///
/// A visit request registered on behalf of a company. `company_id` is the company code.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Visitor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company_id: String,
    pub status: VisitorStatus,
    /// Address of the person who approves or rejects the visit.
    pub contact_email: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Setting {
    pub id: Uuid,
    pub key: String,
    pub value: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// AccessRule
///
/// Which actions a role may take on a named page of the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AccessRule {
    pub id: Uuid,
    pub role: Role,
    pub resource: String,
    pub actions: Vec<Action>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads ---

/// A blank contact email means "none"; anything else must be an address.
fn validate_contact_email(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || value.trim().validate_email() {
        return Ok(());
    }
    let mut err = ValidationError::new("email");
    err.message = Some("Contact email must be a valid email".into());
    Err(err)
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// CreateUserRequest
///
/// `role` is required when an admin creates a user and ignored when a company does
/// (companies can only create their own receptionists). `company_id` accepts either the
/// company's user id or its 3-digit code.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub role: Option<String>,
    pub company_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    pub role: Option<String>,
    pub company_id: Option<String>,
}

/// CreateVisitorRequest
///
/// Receptionists may omit `company_id`; it defaults to their own company.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct CreateVisitorRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    pub company_id: Option<String>,
    pub status: Option<VisitorStatus>,
    #[validate(custom(function = "validate_contact_email"))]
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct UpdateVisitorRequest {
    pub name: Option<String>,
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(custom(function = "validate_contact_email"))]
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateVisitorStatusRequest {
    pub status: VisitorStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NotifyVisitorRequest {
    pub visitor_id: Uuid,
    #[validate(custom(function = "validate_contact_email"))]
    #[serde(default)]
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(default)]
#[ts(export)]
pub struct CreateSettingRequest {
    #[validate(custom(function = "validate_not_blank", message = "Key is required"))]
    pub key: String,
    #[validate(custom(function = "validate_not_blank", message = "Value is required"))]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(default)]
#[ts(export)]
pub struct UpdateSettingRequest {
    #[validate(custom(function = "validate_not_blank", message = "Key cannot be empty"))]
    pub key: Option<String>,
    #[validate(custom(function = "validate_not_blank", message = "Value cannot be empty"))]
    pub value: Option<String>,
}

/// AccessRuleRequest
///
/// Used for both create and update (update replaces the whole rule). Actions arrive as
/// raw strings so unknown verbs can be reported back by name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct AccessRuleRequest {
    pub role: String,
    pub resource: String,
    pub actions: Vec<String>,
}

// --- Responses ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AnalyticsStats {
    pub total_users: i64,
    pub total_visitors: i64,
    /// Visitors still awaiting a decision.
    pub active_visitors: i64,
}

/// TrendPoint
///
/// Number of visitors registered on one UTC day (`YYYY-MM-DD`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct TrendPoint {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

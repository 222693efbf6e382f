use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::{Role, User},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the session token issued at login. The identity is carried entirely by
/// the signed claims, so verifying a request never touches the database.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id.
    pub sub: Uuid,
    pub role: Role,
    /// The company code for company users and receptionists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    /// Issued At (iat).
    pub iat: usize,
    /// Expiration Time (exp): tokens are rejected after this instant.
    pub exp: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers receive it as an
/// extractor argument and hand it to the services, which run every role and scope
/// decision against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub company_id: Option<String>,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            company_id: user.company_id.clone(),
        }
    }
}

/// issue_token
///
/// Signs an HS256 session token for `user`, valid for `config.token_ttl_hours`.
pub fn issue_token(user: &User, config: &AppConfig) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        role: user.role,
        company_id: user.company_id.clone(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(config.token_ttl_hours)).timestamp() as usize,
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// verify_token
///
/// Validates signature and expiry and returns the identity carried by the token.
/// Every failure (malformed, wrongly signed, expired) is `Unauthenticated`.
pub fn verify_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::Unauthenticated("Token expired".to_string()),
        _ => AppError::Unauthenticated("Invalid token".to_string()),
    })?;

    Ok(AuthUser {
        id: data.claims.sub,
        role: data.claims.role,
        company_id: data.claims.company_id,
    })
}

// --- Decision Links ---

/// LinkAction
///
/// The two decisions a contact can make from the notification email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkAction {
    Approve,
    Reject,
}

impl LinkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkAction::Approve => "approve",
            LinkAction::Reject => "reject",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkClaims {
    /// The visitor id.
    pub sub: Uuid,
    pub action: LinkAction,
    pub exp: usize,
}

/// sign_link
///
/// Produces the `token` query value for an approve or reject link. The token is bound
/// to one visitor and one action, and expires after `config.link_ttl_hours`.
pub fn sign_link(
    visitor_id: Uuid,
    action: LinkAction,
    config: &AppConfig,
) -> Result<String, AppError> {
    let claims = LinkClaims {
        sub: visitor_id,
        action,
        exp: (Utc::now() + Duration::hours(config.link_ttl_hours)).timestamp() as usize,
    };
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// verify_link
///
/// Accepts the token only if it is validly signed, unexpired, and names exactly this
/// visitor and this action.
pub fn verify_link(
    token: &str,
    visitor_id: Uuid,
    action: LinkAction,
    secret: &str,
) -> Result<(), AppError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<LinkClaims>(token, &key, &Validation::default())
        .map_err(|_| AppError::Forbidden("This link is invalid or has expired".to_string()))?;

    if data.claims.sub != visitor_id || data.claims.action != action {
        return Err(AppError::Forbidden(
            "This link is invalid or has expired".to_string(),
        ));
    }
    Ok(())
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. The process:
/// 1. Local Bypass: in `Env::Local`, an `x-user-id` header naming an existing user
///    authenticates as that user.
/// 2. Token Extraction: the `Authorization: Bearer <token>` header.
/// 3. Token Validation: signature and expiry via `verify_token`.
///
/// Rejection: `AppError::Unauthenticated` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        // 1. Local Development Bypass
        if config.env == Env::Local {
            if let Some(user_id) = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok())
            {
                let repo = RepositoryState::from_ref(state);
                if let Some(user) = repo.get_user(user_id).await? {
                    tracing::debug!(user_id = %user.id, "authenticated via local bypass");
                    return Ok(AuthUser::from(&user));
                }
            }
        }

        // 2. Token Extraction
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthenticated("Missing or invalid token".to_string()))?;

        // 3. Token Validation
        verify_token(token, &config.jwt_secret)
    }
}

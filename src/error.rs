use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use thiserror::Error;

/// AppError
///
/// The error taxonomy shared by every service and handler. Each variant maps to
/// one fixed HTTP status and a JSON body of the shape `{ "message": ..., "details"?: ... }`,
/// which the client surfaces verbatim.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, malformed, expired or wrongly signed credentials.
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated, but the role (or scope) does not permit the operation.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation or a delete blocked by dependent records.
    #[error("{message}")]
    Conflict {
        message: String,
        details: Option<Value>,
    },

    #[error("{0}")]
    Validation(String),

    #[error("One or more fields are invalid")]
    InvalidFields(#[from] validator::ValidationErrors),

    /// Outbound email could not be handed to the mail provider.
    #[error("Failed to send notification email: {0}")]
    Delivery(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict {
            message: message.into(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::BAD_REQUEST,
            AppError::Validation(_) | AppError::InvalidFields(_) => StatusCode::BAD_REQUEST,
            AppError::Delivery(_)
            | AppError::Database(_)
            | AppError::Token(_)
            | AppError::Hashing(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            AppError::Conflict { message, details } => match details {
                Some(details) => json!({ "message": message, "details": details }),
                None => json!({ "message": message }),
            },
            AppError::InvalidFields(errors) => {
                let mut details: BTreeMap<String, Vec<String>> = BTreeMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({ "message": "One or more fields are invalid", "details": details })
            }
            AppError::Delivery(reason) => {
                tracing::error!(%reason, "notification delivery failed");
                json!({ "message": "Failed to send notification email" })
            }
            e @ (AppError::Database(_)
            | AppError::Token(_)
            | AppError::Hashing(_)
            | AppError::Internal(_)) => {
                tracing::error!(error = %e, "internal server error");
                json!({ "message": "Server error" })
            }
            other => json!({ "message": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

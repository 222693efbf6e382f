//! HTTP handlers.
//!
//! Handlers are deliberately thin: extract the identity, path and body, call the
//! matching service, and wrap the result. All role and scope decisions happen in the
//! services, so every handler answers through `AppError` on failure.

pub mod access_rules;
pub mod analytics;
pub mod auth;
pub mod settings;
pub mod users;
pub mod visitors;

/// Router Module Index
///
/// Organizes the routing into access-segregated modules. Authentication is applied
/// per module as an Axum layer; role checks and scoping happen in the services.

/// Routes reachable without a session: health, login and the email decision links.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware, open to every role.
pub mod authenticated;

/// Admin-only resources (access control, settings). Also behind the auth middleware;
/// the services refuse non-admins.
pub mod admin;

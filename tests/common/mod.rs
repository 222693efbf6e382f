#![allow(dead_code)]

use std::sync::Arc;
use vms_portal::{
    AppState, InMemoryRepository, MockMailer,
    auth::AuthUser,
    config::{AppConfig, SeedAdmin},
    models::{CreateUserRequest, CreateVisitorRequest, User, Visitor},
};

pub const PASSWORD: &str = "secret123";

/// In-memory application state plus a handle on the mailer it sends through.
pub struct TestEnv {
    pub state: AppState,
    pub mailer: MockMailer,
}

pub fn test_env() -> TestEnv {
    test_env_with(AppConfig::default(), MockMailer::new())
}

pub fn test_env_with(config: AppConfig, mailer: MockMailer) -> TestEnv {
    let state = AppState {
        repo: Arc::new(InMemoryRepository::new()),
        mailer: Arc::new(mailer.clone()),
        config,
    };
    TestEnv { state, mailer }
}

pub fn identity(user: &User) -> AuthUser {
    AuthUser::from(user)
}

pub async fn seed_admin(state: &AppState) -> User {
    let seed = SeedAdmin {
        name: "Admin User".to_string(),
        email: "admin@example.com".to_string(),
        password: PASSWORD.to_string(),
    };
    state
        .auth_service()
        .seed_admin(&seed)
        .await
        .unwrap()
        .expect("a fresh store has no admin yet")
}

pub fn user_req(
    name: &str,
    email: &str,
    role: Option<&str>,
    company: Option<&str>,
) -> CreateUserRequest {
    CreateUserRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
        role: role.map(str::to_string),
        company_id: company.map(str::to_string),
    }
}

pub fn visitor_req(
    name: &str,
    company: Option<&str>,
    contact: Option<&str>,
) -> CreateVisitorRequest {
    CreateVisitorRequest {
        name: name.to_string(),
        email: format!("{}@guest.example.com", name.to_lowercase()),
        phone: "555-0100".to_string(),
        company_id: company.map(str::to_string),
        status: None,
        contact_email: contact.map(str::to_string),
    }
}

/// One company with a receptionist, as created through the services.
pub struct Tenant {
    pub company: User,
    pub receptionist: User,
}

pub async fn create_tenant(state: &AppState, admin: &User, name: &str) -> Tenant {
    let slug = name.to_lowercase();
    let company = state
        .user_service()
        .create(
            &identity(admin),
            user_req(name, &format!("{}@example.com", slug), Some("company"), None),
        )
        .await
        .unwrap();

    let receptionist = state
        .user_service()
        .create(
            &identity(&company),
            user_req(
                &format!("{} Desk", name),
                &format!("desk@{}.example.com", slug),
                None,
                None,
            ),
        )
        .await
        .unwrap();

    Tenant {
        company,
        receptionist,
    }
}

pub async fn register_visitor(state: &AppState, receptionist: &User, name: &str) -> Visitor {
    state
        .visitor_service()
        .create(&identity(receptionist), visitor_req(name, None, None))
        .await
        .unwrap()
}

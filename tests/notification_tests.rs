mod common;

use axum::http::StatusCode;
use common::{create_tenant, identity, seed_admin, test_env_with, visitor_req};
use uuid::Uuid;
use vms_portal::{
    AppConfig, AppError, AppState, MockMailer,
    auth::LinkAction,
    models::{NotifyVisitorRequest, UpdateVisitorRequest, User, Visitor, VisitorStatus},
    notifications::NOTIFICATION_SUBJECT,
    repository::Repository,
};

const CONTACT: &str = "host@acme.example.com";

async fn visitor_with_contact(state: &AppState, receptionist: &User) -> Visitor {
    state
        .visitor_service()
        .create(
            &identity(receptionist),
            visitor_req("Alice", None, Some(CONTACT)),
        )
        .await
        .unwrap()
}

fn token_of(link: &str) -> String {
    link.split("token=")
        .nth(1)
        .expect("signed link carries a token")
        .to_string()
}

async fn status_of(state: &AppState, id: Uuid) -> VisitorStatus {
    state.repo.get_visitor(id).await.unwrap().unwrap().status
}

#[tokio::test]
async fn test_notify_sends_decision_links_to_stored_contact() {
    let env = test_env_with(AppConfig::default(), MockMailer::new());
    let state = &env.state;
    let admin = seed_admin(state).await;
    let acme = create_tenant(state, &admin, "Acme").await;
    let visitor = visitor_with_contact(state, &acme.receptionist).await;

    let response = state
        .notification_service()
        .notify(
            &identity(&acme.receptionist),
            NotifyVisitorRequest {
                visitor_id: visitor.id,
                contact_email: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(response.message, "Notification email sent");

    let sent = env.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, CONTACT);
    assert_eq!(sent[0].subject, NOTIFICATION_SUBJECT);
    assert!(sent[0].html.contains("Alice"));
    assert!(sent[0].html.contains(&format!(
        "http://localhost:3000/api/visitors/approve/{}?token=",
        visitor.id
    )));
    assert!(sent[0].html.contains(&format!(
        "http://localhost:3000/api/visitors/reject/{}?token=",
        visitor.id
    )));
}

#[tokio::test]
async fn test_request_contact_overrides_stored_one() {
    let env = test_env_with(AppConfig::default(), MockMailer::new());
    let state = &env.state;
    let admin = seed_admin(state).await;
    let acme = create_tenant(state, &admin, "Acme").await;
    let visitor = visitor_with_contact(state, &acme.receptionist).await;

    state
        .notification_service()
        .notify(
            &identity(&admin),
            NotifyVisitorRequest {
                visitor_id: visitor.id,
                contact_email: Some("security@acme.example.com".into()),
            },
        )
        .await
        .unwrap();

    assert_eq!(env.mailer.sent()[0].to, "security@acme.example.com");
}

#[tokio::test]
async fn test_notify_without_any_contact_is_rejected() {
    let env = test_env_with(AppConfig::default(), MockMailer::new());
    let state = &env.state;
    let admin = seed_admin(state).await;
    let acme = create_tenant(state, &admin, "Acme").await;
    let visitor = common::register_visitor(state, &acme.receptionist, "Bob").await;

    let err = state
        .notification_service()
        .notify(
            &identity(&acme.receptionist),
            NotifyVisitorRequest {
                visitor_id: visitor.id,
                contact_email: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Contact email is required");
    assert!(env.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_request_contact_is_rejected_before_sending() {
    let env = test_env_with(AppConfig::default(), MockMailer::new());
    let state = &env.state;
    let admin = seed_admin(state).await;
    let acme = create_tenant(state, &admin, "Acme").await;
    let visitor = visitor_with_contact(state, &acme.receptionist).await;

    let err = state
        .notification_service()
        .notify(
            &identity(&acme.receptionist),
            NotifyVisitorRequest {
                visitor_id: visitor.id,
                contact_email: Some("not-an-email".into()),
            },
        )
        .await
        .unwrap_err();

    match err {
        AppError::InvalidFields(errors) => {
            assert!(errors.field_errors().contains_key("contact_email"));
        }
        other => panic!("expected field errors, got {:?}", other),
    }
    assert!(env.mailer.sent().is_empty());

    // A blank request contact still falls back to the stored one.
    state
        .notification_service()
        .notify(
            &identity(&acme.receptionist),
            NotifyVisitorRequest {
                visitor_id: visitor.id,
                contact_email: Some("  ".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(env.mailer.sent()[0].to, CONTACT);
}

#[tokio::test]
async fn test_blank_contact_email_clears_stored_contact() {
    let env = test_env_with(AppConfig::default(), MockMailer::new());
    let state = &env.state;
    let admin = seed_admin(state).await;
    let acme = create_tenant(state, &admin, "Acme").await;
    let visitor = visitor_with_contact(state, &acme.receptionist).await;
    let desk = identity(&acme.receptionist);

    let bad = state
        .visitor_service()
        .update(
            &desk,
            visitor.id,
            UpdateVisitorRequest {
                contact_email: Some("nope".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(bad, AppError::InvalidFields(_)));

    let cleared = state
        .visitor_service()
        .update(
            &desk,
            visitor.id,
            UpdateVisitorRequest {
                contact_email: Some("".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.contact_email, None);

    let err = state
        .notification_service()
        .notify(
            &desk,
            NotifyVisitorRequest {
                visitor_id: visitor.id,
                contact_email: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Contact email is required");
}

#[tokio::test]
async fn test_mail_failure_is_reported_as_delivery_error() {
    let env = test_env_with(AppConfig::default(), MockMailer::new_failing());
    let state = &env.state;
    let admin = seed_admin(state).await;
    let acme = create_tenant(state, &admin, "Acme").await;
    let visitor = visitor_with_contact(state, &acme.receptionist).await;

    let err = state
        .notification_service()
        .notify(
            &identity(&acme.receptionist),
            NotifyVisitorRequest {
                visitor_id: visitor.id,
                contact_email: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Delivery(_)));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    // The visitor itself is untouched by a failed notification.
    assert_eq!(status_of(state, visitor.id).await, VisitorStatus::Pending);
}

#[tokio::test]
async fn test_notify_respects_role_and_scope() {
    let env = test_env_with(AppConfig::default(), MockMailer::new());
    let state = &env.state;
    let admin = seed_admin(state).await;
    let acme = create_tenant(state, &admin, "Acme").await;
    let globex = create_tenant(state, &admin, "Globex").await;
    let visitor = visitor_with_contact(state, &acme.receptionist).await;
    let request = || NotifyVisitorRequest {
        visitor_id: visitor.id,
        contact_email: None,
    };

    let by_company = state
        .notification_service()
        .notify(&identity(&acme.company), request())
        .await
        .unwrap_err();
    assert!(matches!(by_company, AppError::Forbidden(_)));

    let by_outsider = state
        .notification_service()
        .notify(&identity(&globex.receptionist), request())
        .await
        .unwrap_err();
    assert_eq!(by_outsider.to_string(), "Visitor not found");
    assert!(env.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_decision_links_are_single_use() {
    let env = test_env_with(AppConfig::default(), MockMailer::new());
    let state = &env.state;
    let admin = seed_admin(state).await;
    let acme = create_tenant(state, &admin, "Acme").await;
    let visitor = visitor_with_contact(state, &acme.receptionist).await;
    let notifications = state.notification_service();

    let approve = token_of(
        &notifications
            .decision_link(visitor.id, LinkAction::Approve)
            .unwrap(),
    );
    let reject = token_of(
        &notifications
            .decision_link(visitor.id, LinkAction::Reject)
            .unwrap(),
    );

    let page = notifications
        .decide(visitor.id, LinkAction::Approve, Some(&approve))
        .await
        .unwrap();
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.html.contains("Visitor Approved"));
    assert!(page.html.contains("http://localhost:5173/visitors"));
    assert_eq!(status_of(state, visitor.id).await, VisitorStatus::Allowed);

    let again = notifications
        .decide(visitor.id, LinkAction::Approve, Some(&approve))
        .await
        .unwrap();
    assert_eq!(again.status, StatusCode::CONFLICT);

    let late_reject = notifications
        .decide(visitor.id, LinkAction::Reject, Some(&reject))
        .await
        .unwrap();
    assert_eq!(late_reject.status, StatusCode::CONFLICT);
    assert!(late_reject.html.contains("already been allowed"));
    assert_eq!(status_of(state, visitor.id).await, VisitorStatus::Allowed);
}

#[tokio::test]
async fn test_reject_link_rejects_pending_visitor() {
    let env = test_env_with(AppConfig::default(), MockMailer::new());
    let state = &env.state;
    let admin = seed_admin(state).await;
    let acme = create_tenant(state, &admin, "Acme").await;
    let visitor = visitor_with_contact(state, &acme.receptionist).await;
    let notifications = state.notification_service();

    let reject = token_of(
        &notifications
            .decision_link(visitor.id, LinkAction::Reject)
            .unwrap(),
    );
    let page = notifications
        .decide(visitor.id, LinkAction::Reject, Some(&reject))
        .await
        .unwrap();

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.html.contains("Visitor Rejected"));
    assert_eq!(status_of(state, visitor.id).await, VisitorStatus::Rejected);
}

#[tokio::test]
async fn test_link_reports_the_stored_decision() {
    let env = test_env_with(AppConfig::default(), MockMailer::new());
    let state = &env.state;
    let admin = seed_admin(state).await;
    let acme = create_tenant(state, &admin, "Acme").await;
    let visitor = visitor_with_contact(state, &acme.receptionist).await;
    let notifications = state.notification_service();
    let approve = token_of(
        &notifications
            .decision_link(visitor.id, LinkAction::Approve)
            .unwrap(),
    );

    // Decided from the dashboard before the email was opened.
    state
        .visitor_service()
        .update_status(&identity(&acme.company), visitor.id, VisitorStatus::Rejected)
        .await
        .unwrap();
    let page = notifications
        .decide(visitor.id, LinkAction::Approve, Some(&approve))
        .await
        .unwrap();
    assert_eq!(page.status, StatusCode::CONFLICT);
    assert!(page.html.contains("already been rejected"));

    // Once back to pending, the same link decides.
    state
        .visitor_service()
        .update_status(&identity(&acme.company), visitor.id, VisitorStatus::Pending)
        .await
        .unwrap();
    let page = notifications
        .decide(visitor.id, LinkAction::Approve, Some(&approve))
        .await
        .unwrap();
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(status_of(state, visitor.id).await, VisitorStatus::Allowed);

    state
        .visitor_service()
        .delete(&identity(&acme.receptionist), visitor.id)
        .await
        .unwrap();
    let gone = notifications
        .decide(visitor.id, LinkAction::Approve, Some(&approve))
        .await
        .unwrap();
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert!(!gone.html.contains("already been"));
}

#[tokio::test]
async fn test_forged_links_are_refused() {
    let env = test_env_with(AppConfig::default(), MockMailer::new());
    let state = &env.state;
    let admin = seed_admin(state).await;
    let acme = create_tenant(state, &admin, "Acme").await;
    let visitor = visitor_with_contact(state, &acme.receptionist).await;
    let other = common::register_visitor(state, &acme.receptionist, "Bob").await;
    let notifications = state.notification_service();

    let approve = token_of(
        &notifications
            .decision_link(visitor.id, LinkAction::Approve)
            .unwrap(),
    );

    let tampered = format!("{}x", approve);
    let cases = [
        (visitor.id, LinkAction::Approve, Some(tampered.as_str())),
        (visitor.id, LinkAction::Reject, Some(approve.as_str())),
        (other.id, LinkAction::Approve, Some(approve.as_str())),
        (visitor.id, LinkAction::Approve, None),
    ];

    for (id, action, token) in cases {
        let page = notifications.decide(id, action, token).await.unwrap();
        assert_eq!(page.status, StatusCode::FORBIDDEN);
    }

    assert_eq!(status_of(state, visitor.id).await, VisitorStatus::Pending);
    assert_eq!(status_of(state, other.id).await, VisitorStatus::Pending);
}

#[tokio::test]
async fn test_expired_link_is_refused() {
    let config = AppConfig {
        link_ttl_hours: -1,
        ..AppConfig::default()
    };
    let env = test_env_with(config, MockMailer::new());
    let state = &env.state;
    let admin = seed_admin(state).await;
    let acme = create_tenant(state, &admin, "Acme").await;
    let visitor = visitor_with_contact(state, &acme.receptionist).await;
    let notifications = state.notification_service();

    let approve = token_of(
        &notifications
            .decision_link(visitor.id, LinkAction::Approve)
            .unwrap(),
    );
    let page = notifications
        .decide(visitor.id, LinkAction::Approve, Some(&approve))
        .await
        .unwrap();

    assert_eq!(page.status, StatusCode::FORBIDDEN);
    assert_eq!(status_of(state, visitor.id).await, VisitorStatus::Pending);
}

#[tokio::test]
async fn test_unsigned_links_when_signing_is_disabled() {
    let config = AppConfig {
        signed_links: false,
        ..AppConfig::default()
    };
    let env = test_env_with(config, MockMailer::new());
    let state = &env.state;
    let admin = seed_admin(state).await;
    let acme = create_tenant(state, &admin, "Acme").await;
    let visitor = visitor_with_contact(state, &acme.receptionist).await;
    let notifications = state.notification_service();

    let link = notifications
        .decision_link(visitor.id, LinkAction::Approve)
        .unwrap();
    assert_eq!(
        link,
        format!("http://localhost:3000/api/visitors/approve/{}", visitor.id)
    );

    let page = notifications
        .decide(visitor.id, LinkAction::Approve, None)
        .await
        .unwrap();
    assert_eq!(page.status, StatusCode::OK);

    let missing = notifications
        .decide(Uuid::new_v4(), LinkAction::Approve, None)
        .await
        .unwrap();
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

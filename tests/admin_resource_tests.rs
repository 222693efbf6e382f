mod common;

use common::{identity, seed_admin, test_env};
use uuid::Uuid;
use vms_portal::{
    AppError,
    models::{AccessRuleRequest, Action, CreateSettingRequest, Role, UpdateSettingRequest},
};

fn setting(key: &str, value: &str) -> CreateSettingRequest {
    CreateSettingRequest {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn blank_fields(err: &AppError) -> Vec<String> {
    match err {
        AppError::InvalidFields(errors) => {
            let mut fields: Vec<String> =
                errors.field_errors().keys().map(|k| k.to_string()).collect();
            fields.sort();
            fields
        }
        other => panic!("expected field errors, got {:?}", other),
    }
}

fn rule(role: &str, resource: &str, actions: &[&str]) -> AccessRuleRequest {
    AccessRuleRequest {
        role: role.to_string(),
        resource: resource.to_string(),
        actions: actions.iter().map(|a| a.to_string()).collect(),
    }
}

#[tokio::test]
async fn test_setting_lifecycle() {
    let env = test_env();
    let admin = seed_admin(&env.state).await;
    let caller = identity(&admin);
    let settings = env.state.settings_service();

    let created = settings
        .create(&caller, setting(" site_name ", "Front Desk"))
        .await
        .unwrap();
    assert_eq!(created.key, "site_name");

    let updated = settings
        .update(
            &caller,
            created.id,
            UpdateSettingRequest {
                key: None,
                value: Some("Reception".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.key, "site_name");
    assert_eq!(updated.value, "Reception");

    let listed = settings.list(&caller).await.unwrap();
    assert_eq!(listed.len(), 1);

    let deleted = settings.delete(&caller, created.id).await.unwrap();
    assert_eq!(deleted.message, "Setting deleted");

    let again = settings.delete(&caller, created.id).await.unwrap_err();
    assert_eq!(again.to_string(), "Setting not found");
}

#[tokio::test]
async fn test_setting_keys_are_unique() {
    let env = test_env();
    let admin = seed_admin(&env.state).await;
    let caller = identity(&admin);
    let settings = env.state.settings_service();

    settings
        .create(&caller, setting("theme", "light"))
        .await
        .unwrap();
    let other = settings
        .create(&caller, setting("locale", "en"))
        .await
        .unwrap();

    let duplicate = settings
        .create(&caller, setting("theme", "dark"))
        .await
        .unwrap_err();
    assert!(matches!(duplicate, AppError::Conflict { .. }));
    assert_eq!(duplicate.to_string(), "Setting key already exists");

    let renamed = settings
        .update(
            &caller,
            other.id,
            UpdateSettingRequest {
                key: Some("theme".into()),
                value: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(renamed, AppError::Conflict { .. }));
}

#[tokio::test]
async fn test_setting_fields_must_not_be_blank() {
    let env = test_env();
    let admin = seed_admin(&env.state).await;
    let caller = identity(&admin);
    let settings = env.state.settings_service();

    let err = settings
        .create(&caller, setting("theme", "  "))
        .await
        .unwrap_err();
    assert_eq!(blank_fields(&err), vec!["value"]);

    let created = settings
        .create(&caller, setting("theme", "light"))
        .await
        .unwrap();
    let blank = settings
        .update(
            &caller,
            created.id,
            UpdateSettingRequest {
                key: Some("".into()),
                value: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(blank_fields(&blank), vec!["key"]);

    let missing = settings
        .update(&caller, Uuid::new_v4(), UpdateSettingRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_access_rule_lifecycle() {
    let env = test_env();
    let admin = seed_admin(&env.state).await;
    let caller = identity(&admin);
    let rules = env.state.access_rule_service();

    let created = rules
        .create(
            &caller,
            rule("receptionist", "visitors", &["read", "write", "read"]),
        )
        .await
        .unwrap();
    assert_eq!(created.role, Role::Receptionist);
    assert_eq!(created.actions, vec![Action::Read, Action::Write]);

    let replaced = rules
        .update(&caller, created.id, rule("company", "analytics", &["read"]))
        .await
        .unwrap();
    assert_eq!(replaced.role, Role::Company);
    assert_eq!(replaced.resource, "analytics");
    assert_eq!(replaced.actions, vec![Action::Read]);

    let deleted = rules.delete(&caller, created.id).await.unwrap();
    assert_eq!(deleted.message, "Access rule deleted");
    assert!(rules.list(&caller).await.unwrap().is_empty());

    let missing = rules
        .update(&caller, created.id, rule("company", "analytics", &["read"]))
        .await
        .unwrap_err();
    assert_eq!(missing.to_string(), "Access rule not found");
}

#[tokio::test]
async fn test_access_rule_input_is_checked() {
    let env = test_env();
    let admin = seed_admin(&env.state).await;
    let caller = identity(&admin);
    let rules = env.state.access_rule_service();

    let actions = rules
        .create(
            &caller,
            rule("company", "visitors", &["read", "fly", "teleport"]),
        )
        .await
        .unwrap_err();
    assert_eq!(actions.to_string(), "Invalid actions: fly, teleport");

    let role = rules
        .create(&caller, rule("guest", "visitors", &["read"]))
        .await
        .unwrap_err();
    assert_eq!(role.to_string(), "Invalid role: guest");

    let resource = rules
        .create(&caller, rule("company", " ", &["read"]))
        .await
        .unwrap_err();
    assert_eq!(resource.to_string(), "Resource is required");

    let empty = rules
        .create(&caller, rule("company", "visitors", &[]))
        .await
        .unwrap_err();
    assert_eq!(empty.to_string(), "At least one action is required");
}

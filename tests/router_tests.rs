mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{PASSWORD, create_tenant, register_visitor, seed_admin, test_env, test_env_with};
use serde_json::{Value, json};
use tower::ServiceExt;
use vms_portal::{
    AppConfig, MockMailer,
    auth::LinkAction,
    config::Env,
    create_router,
    models::{AuthResponse, Visitor},
};

struct Reply {
    status: StatusCode,
    content_type: String,
    request_id: Option<String>,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

async fn call(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();

    Reply {
        status,
        content_type,
        request_id,
        body,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token).parse().unwrap(),
    );
    request
}

fn as_user(mut request: Request<Body>, id: uuid::Uuid) -> Request<Body> {
    request
        .headers_mut()
        .insert("x-user-id", id.to_string().parse().unwrap());
    request
}

async fn login(app: &Router, email: &str) -> String {
    let reply = call(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": email, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let auth: AuthResponse = serde_json::from_slice(&reply.body).unwrap();
    auth.token
}

#[tokio::test]
async fn test_health_check() {
    let env = test_env();
    let app = create_router(env.state);

    let reply = call(&app, get("/api/health")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.text(), "ok");
    assert!(reply.request_id.is_some());
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let env = test_env();
    let app = create_router(env.state);

    let reply = call(&app, get("/api-docs/openapi.json")).await;
    assert_eq!(reply.status, StatusCode::OK);

    let doc = reply.json();
    let paths = doc["paths"].as_object().unwrap();
    assert!(paths.contains_key("/api/visitors/notify"));
    assert!(paths.contains_key("/api/visitors/approve/{id}"));
    assert!(paths.contains_key("/api/access-control/{id}"));
}

#[tokio::test]
async fn test_protected_routes_require_a_session() {
    let env = test_env();
    let app = create_router(env.state);

    let missing = call(&app, get("/api/visitors")).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json()["message"], "Missing or invalid token");

    let garbage = call(&app, with_bearer(get("/api/auth/me"), "not-a-jwt")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.json()["message"], "Invalid token");

    let admin_only = call(&app, get("/api/settings")).await;
    assert_eq!(admin_only.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_and_current_user() {
    let env = test_env();
    seed_admin(&env.state).await;
    let app = create_router(env.state);

    let token = login(&app, "Admin@Example.com").await;

    let me = call(&app, with_bearer(get("/api/auth/me"), &token)).await;
    assert_eq!(me.status, StatusCode::OK);
    let body = me.json();
    assert_eq!(body["email"], "admin@example.com");
    assert_eq!(body["role"], "admin");
    assert!(body.get("passwordHash").is_none());

    let wrong = call(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "admin@example.com", "password": "nope-nope" }),
        ),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json()["message"], "Invalid credentials");

    let unknown = call(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "ghost@example.com", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(unknown.json()["message"], "Invalid credentials");

    let malformed = call(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "not-an-email", "password": "" }),
        ),
    )
    .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    let details = malformed.json()["details"].clone();
    assert!(details.get("email").is_some());
    assert!(details.get("password").is_some());
}

#[tokio::test]
async fn test_local_user_header_bypass() {
    let env = test_env();
    let admin = seed_admin(&env.state).await;
    let acme = create_tenant(&env.state, &admin, "Acme").await;
    let app = create_router(env.state);

    let as_admin = call(&app, as_user(get("/api/settings"), admin.id)).await;
    assert_eq!(as_admin.status, StatusCode::OK);
    assert_eq!(as_admin.json(), json!([]));

    let as_company = call(&app, as_user(get("/api/settings"), acme.company.id)).await;
    assert_eq!(as_company.status, StatusCode::FORBIDDEN);
    assert_eq!(as_company.json()["message"], "Access denied");

    // An id that matches nobody falls through to the token check.
    let stranger = call(&app, as_user(get("/api/visitors"), uuid::Uuid::new_v4())).await;
    assert_eq!(stranger.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_header_is_ignored_in_production() {
    let config = AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    };
    let env = test_env_with(config, MockMailer::new());
    let admin = seed_admin(&env.state).await;
    let app = create_router(env.state);

    let reply = call(&app, as_user(get("/api/settings"), admin.id)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_delete_over_http() {
    let env = test_env();
    seed_admin(&env.state).await;
    let app = create_router(env.state);
    let token = login(&app, "admin@example.com").await;

    let created = call(
        &app,
        with_bearer(
            json_request(
                "POST",
                "/api/users",
                json!({
                    "name": "Acme",
                    "email": "acme@example.com",
                    "password": PASSWORD,
                    "role": "company"
                }),
            ),
            &token,
        ),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["companyId"], "001");

    let visitor = call(
        &app,
        with_bearer(
            json_request(
                "POST",
                "/api/visitors",
                json!({
                    "name": "Alice",
                    "email": "alice@guest.example.com",
                    "phone": "555-0100",
                    "companyId": "001"
                }),
            ),
            &token,
        ),
    )
    .await;
    assert_eq!(visitor.status, StatusCode::CREATED);
    let visitor: Visitor = serde_json::from_slice(&visitor.body).unwrap();

    let company_id = created.json()["id"].as_str().unwrap().to_string();
    let blocked = call(
        &app,
        with_bearer(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/users/{}", company_id))
                .body(Body::empty())
                .unwrap(),
            &token,
        ),
    )
    .await;
    assert_eq!(blocked.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        blocked.json()["details"],
        json!({ "receptionists": 0, "visitors": 1 })
    );

    let deleted = call(
        &app,
        with_bearer(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/visitors/{}", visitor.id))
                .body(Body::empty())
                .unwrap(),
            &token,
        ),
    )
    .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.json(), json!({ "message": "Visitor deleted" }));

    let missing = call(
        &app,
        with_bearer(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/visitors/{}", visitor.id))
                .body(Body::empty())
                .unwrap(),
            &token,
        ),
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_decision_link_answers_with_html() {
    let env = test_env();
    let admin = seed_admin(&env.state).await;
    let acme = create_tenant(&env.state, &admin, "Acme").await;
    let visitor = register_visitor(&env.state, &acme.receptionist, "Alice").await;
    let link = env
        .state
        .notification_service()
        .decision_link(visitor.id, LinkAction::Approve)
        .unwrap();
    let app = create_router(env.state);

    let path = link.trim_start_matches("http://localhost:3000");

    let approved = call(&app, get(path)).await;
    assert_eq!(approved.status, StatusCode::OK);
    assert!(approved.content_type.starts_with("text/html"));
    assert!(approved.text().contains("Visitor Approved"));

    let replay = call(&app, get(path)).await;
    assert_eq!(replay.status, StatusCode::CONFLICT);

    let unsigned = call(
        &app,
        get(&format!("/api/visitors/reject/{}", visitor.id)),
    )
    .await;
    assert_eq!(unsigned.status, StatusCode::FORBIDDEN);
    assert!(unsigned.content_type.starts_with("text/html"));
}

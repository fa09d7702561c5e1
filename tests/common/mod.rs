//! Shared setup for the integration tests: an in-memory `AppState`, the app
//! wired the same way `main.rs` wires it, and helpers for getting a token.
#![allow(dead_code)]

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::Logger;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use serde_json::{json, Value};
use uuid::Uuid;

use tasktrack::auth::{LoginResponse, RegisterResponse};
use tasktrack::config::AuthConfig;
use tasktrack::models::{NewUser, Role};
use tasktrack::routes::{self, health};
use tasktrack::store::MemoryStore;
use tasktrack::AppState;

pub const PASSWORD: &str = "Password123!";

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret".to_string(),
        token_ttl_days: 7,
        // bcrypt's minimum cost keeps the suite fast.
        bcrypt_cost: 4,
    }
}

pub fn test_state() -> AppState {
    AppState::new(MemoryStore::new(), &auth_config())
}

pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600),
        )
        .wrap(Logger::default())
        .service(health::health)
        .service(web::scope("/api").configure(routes::config))
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

/// Sends a request and returns status and JSON body.
///
/// Rejections from `AuthGate` come back as service errors rather than
/// responses, so both paths are rendered the way the server would render them.
pub async fn send(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    req: actix_http::Request,
) -> (StatusCode, Value) {
    match test::try_call_service(app, req).await {
        Ok(resp) => {
            let status = resp.status();
            let body = test::read_body(resp).await;
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        }
        Err(err) => {
            let resp = err.error_response();
            let status = resp.status();
            let body = actix_web::body::to_bytes(resp.into_body())
                .await
                .expect("error body");
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        }
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

pub async fn register(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    name: &str,
    email: &str,
) -> Uuid {
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&json!({ "name": name, "email": email, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert!(
        resp.status().is_success(),
        "Failed to register {}. Status: {}",
        email,
        resp.status()
    );
    let body: RegisterResponse = test::read_body_json(resp).await;
    body.user_id
}

pub async fn login(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
) -> String {
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(&json!({ "email": email, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert!(
        resp.status().is_success(),
        "Failed to log in {}. Status: {}",
        email,
        resp.status()
    );
    let body: LoginResponse = test::read_body_json(resp).await;
    body.token
}

pub async fn register_and_login(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    name: &str,
    email: &str,
) -> TestUser {
    let id = register(app, name, email).await;
    let token = login(app, email).await;
    TestUser { id, token }
}

/// Admins cannot be created over HTTP, so the account goes straight into the store.
pub async fn admin(
    state: &AppState,
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
) -> TestUser {
    let password_hash = state.passwords.hash(PASSWORD).expect("hash password");
    let user = state
        .users
        .create_user(NewUser {
            name: "Admin".to_string(),
            email: email.to_string(),
            password_hash,
            role: Role::Admin,
        })
        .await
        .expect("create admin");
    let token = login(app, email).await;
    TestUser { id: user.id, token }
}

pub async fn create_task(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    token: &str,
    payload: serde_json::Value,
) -> Uuid {
    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .append_header(bearer(token))
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(
        resp.status(),
        StatusCode::CREATED,
        "Failed to create task {}",
        payload
    );
    let body: serde_json::Value = test::read_body_json(resp).await;
    body["id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .expect("task id in response")
}

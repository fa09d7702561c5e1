use crate::{
    auth::{normalize_email, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
    error::AppError,
    models::{NewUser, Role},
    state::AppState,
};
use actix_web::{post, web, HttpResponse, Responder};
use log::info;
use validator::Validate;

/// Register a new user
///
/// Creates a regular (non-admin) account. The password is stored as a bcrypt hash.
///
/// ## Responses:
/// - `200 OK`: `{"message": "User created", "user_id": ...}`.
/// - `400 Bad Request`: missing or invalid fields, or the email is already registered.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let mut register_data = register_data.into_inner();
    register_data.email = normalize_email(&register_data.email);
    register_data.validate()?;

    if state
        .users
        .find_user_by_email(&register_data.email)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = state.passwords.hash(&register_data.password)?;

    let user = state
        .users
        .create_user(NewUser {
            name: register_data.name.trim().to_string(),
            email: register_data.email,
            password_hash,
            role: Role::User,
        })
        .await?;
    info!("registered user {}", user.id);

    Ok(HttpResponse::Ok().json(RegisterResponse {
        message: "User created".into(),
        user_id: user.id,
    }))
}

/// Login user
///
/// Returns a bearer token and the user. An unknown email and a wrong password
/// produce the same `400 Invalid credentials` response.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let record = state
        .users
        .find_user_by_email(&normalize_email(&login_data.email))
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !state.passwords.verify(&login_data.password, &record.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let token = state.tokens.issue(record.id)?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: record.into_user(),
    }))
}

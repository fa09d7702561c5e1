//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every failure a request can hit is resolved into exactly one `AppError`, which
//! `actix_web::error::ResponseError` turns into the terminal HTTP response.
//!
//! Authentication failures carry an internal `AuthFailure` cause for diagnostics,
//! but the response only ever says "No token" or "Invalid token". Internal errors
//! are logged and answered with a generic message.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Why the auth gate rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `Authorization` header at all.
    MissingCredential,
    /// Header present but not of the form `Bearer <token>`.
    MalformedHeader,
    /// Token failed verification (bad signature, expired, garbled).
    InvalidToken,
    /// Token verified but its subject no longer exists.
    UnknownSubject,
}

impl AuthFailure {
    /// The only message ever shown to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthFailure::MissingCredential => "No token",
            _ => "Invalid token",
        }
    }
}

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Authentication failed at the gate (HTTP 401).
    Unauthorized(AuthFailure),
    /// Login with an unknown email or a wrong password (HTTP 400).
    InvalidCredentials,
    /// Registration with an email that is already taken (HTTP 400).
    DuplicateEmail,
    /// The caller is authenticated but its role does not allow the action (HTTP 403).
    Forbidden(String),
    /// Represents a client-side error due to a malformed or invalid request (HTTP 400).
    BadRequest(String),
    /// Represents a situation where a requested resource was not found (HTTP 404).
    NotFound(String),
    /// Represents an unexpected server-side error (HTTP 500).
    InternalServerError(String),
    /// Represents an error originating from database operations (HTTP 500).
    DatabaseError(String),
    /// Input failed validation (HTTP 400).
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(cause) => write!(f, "Unauthorized: {:?}", cause),
            AppError::InvalidCredentials => write!(f, "Invalid credentials"),
            AppError::DuplicateEmail => write!(f, "Email already registered"),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredentials
            | AppError::DuplicateEmail
            | AppError::BadRequest(_)
            | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Unauthorized(cause) => cause.public_message().to_string(),
            AppError::InvalidCredentials | AppError::DuplicateEmail => self.to_string(),
            AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg) => msg.clone(),
            // Internals stay in the log.
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                log::error!("{}", self);
                "Internal server error".to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// A unique violation on the users' email index becomes `DuplicateEmail`,
/// which covers the race between the existence check and the insert.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match &error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(db) if db.constraint() == Some("users_email_key") => {
                AppError::DuplicateEmail
            }
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// Any token processing failure is an invalid credential; the JWT error kind is dropped.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(_: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(AuthFailure::InvalidToken)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

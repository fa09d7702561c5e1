pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::User;

// Re-export necessary items
pub use extractors::AuthContext;
pub use middleware::{authenticate, AuthGate};
pub use password::PasswordHasher;
pub use token::{Claims, TokenCodec};

/// Normalises an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Represents the payload for a user login request.
///
/// Only presence is checked: a malformed email fails the same way as an
/// unknown one.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Missing fields"))]
    pub email: String,
    #[validate(length(min = 1, message = "Missing fields"))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name, 1 to 100 characters.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Must be a valid email format.
    #[validate(email)]
    pub email: String,
    /// Any non-empty password.
    #[validate(length(min = 1, message = "Missing fields"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: Uuid,
}

/// Response to a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    pub user: User,
}

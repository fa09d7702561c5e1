use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;
use crate::models::User;

/// The identity resolved by `AuthGate` for the current request.
///
/// Handlers behind the gate take this as an argument. The user it carries
/// existed at the time of the request and has no password hash.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    /// Fails with `Forbidden` unless the caller is an admin.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Forbidden".into()))
        }
    }
}

impl FromRequest for AuthContext {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthContext>().cloned() {
            Some(context) => ready(Ok(context)),
            // Only reachable on a route that is not wrapped by the gate.
            None => ready(Err(AppError::InternalServerError(
                "AuthContext missing; route is not behind AuthGate".to_string(),
            )
            .into())),
        }
    }
}

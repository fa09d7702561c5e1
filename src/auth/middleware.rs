use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::debug;
use std::rc::Rc;

use crate::auth::extractors::AuthContext;
use crate::auth::token::TokenCodec;
use crate::error::{AppError, AuthFailure};
use crate::models::User;
use crate::state::AppState;
use crate::store::UserStore;

/// Returns the token of a `Bearer <token>` header value.
fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolves an `Authorization` header value to a live user.
///
/// A missing header fails before any token or store work. Every other failure
/// is an invalid credential, whatever its cause.
pub async fn authenticate(
    authorization: Option<&str>,
    tokens: &TokenCodec,
    users: &dyn UserStore,
) -> Result<User, AppError> {
    let header_value = authorization.ok_or(AppError::Unauthorized(AuthFailure::MissingCredential))?;
    let token =
        bearer_token(header_value).ok_or(AppError::Unauthorized(AuthFailure::MalformedHeader))?;
    let claims = tokens.verify(token)?;

    users
        .find_user_by_id(claims.sub)
        .await?
        .ok_or(AppError::Unauthorized(AuthFailure::UnknownSubject))
}

/// Middleware guarding a scope: only requests carrying a valid bearer token
/// for an existing user reach the wrapped handlers, with an `AuthContext`
/// in their extensions.
pub struct AuthGate;

impl<S, B> Transform<S, ServiceRequest> for AuthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthGateService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthGateService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let state = req
                .app_data::<web::Data<AppState>>()
                .cloned()
                .ok_or_else(|| AppError::InternalServerError("AppState is not registered".into()))?;

            // A header that is not valid UTF-8 still counts as present.
            let authorization = req
                .headers()
                .get(header::AUTHORIZATION)
                .map(|value| value.to_str().unwrap_or_default().to_owned());

            let user = match authenticate(
                authorization.as_deref(),
                &state.tokens,
                state.users.as_ref(),
            )
            .await
            {
                Ok(user) => user,
                Err(err) => {
                    if let AppError::Unauthorized(cause) = &err {
                        debug!("rejected {} {}: {:?}", req.method(), req.path(), cause);
                    }
                    return Err(err.into());
                }
            };

            req.extensions_mut().insert(AuthContext::new(user));
            service.call(req).await
        })
    }
}

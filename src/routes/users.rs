use crate::{auth::AuthContext, error::AppError, state::AppState};
use actix_web::{delete, get, web, HttpResponse, Responder};
use log::info;
use serde_json::json;
use uuid::Uuid;

/// Lists users as `{id, name, email}`, e.g. for picking an assignee.
#[get("")]
pub async fn list_users(
    state: web::Data<AppState>,
    _context: AuthContext,
) -> Result<impl Responder, AppError> {
    let users = state.users.list_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

/// Returns the caller as resolved by the auth gate.
#[get("/me")]
pub async fn me(context: AuthContext) -> impl Responder {
    HttpResponse::Ok().json(context.user)
}

/// Deletes a user. Admin only.
///
/// Tasks assigned to the user become unassigned; tasks the user created stay.
#[delete("/{id}")]
pub async fn delete_user(
    state: web::Data<AppState>,
    context: AuthContext,
    user_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    context.require_admin()?;
    let user_id = user_id.into_inner();

    if !state.users.delete_user(user_id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    info!("user {} deleted by admin {}", user_id, context.user.id);

    Ok(HttpResponse::Ok().json(json!({ "message": "Deleted" })))
}

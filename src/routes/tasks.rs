use crate::{
    auth::AuthContext,
    error::AppError,
    models::{Pagination, Task, TaskFilter, TaskInput, TaskPage, TaskQuery, TaskUpdate},
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

/// Assignees are weak references, but a new assignment must name a user that exists now.
async fn ensure_assignee_exists(state: &AppState, assignee: Option<Uuid>) -> Result<(), AppError> {
    if let Some(id) = assignee {
        if state.users.find_user_by_id(id).await?.is_none() {
            return Err(AppError::BadRequest("Assignee does not exist".into()));
        }
    }
    Ok(())
}

/// Lists tasks visible to the caller, newest first.
///
/// Non-admin callers only see tasks they created or are assigned to, unless
/// they pass `all`. Explicit filters always apply.
///
/// ## Query Parameters:
/// - `page` (default 1), `limit` (default 10, max 100)
/// - `assigned_to`, `priority`, `status` (optional filters)
/// - `all` (optional): skip ownership scoping
///
/// ## Responses:
/// - `200 OK`: `{"tasks": [...], "page", "limit", "total", "pages"}`.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    context: AuthContext,
    query_params: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let filter = TaskFilter::for_listing(&context.user, &query_params);
    let pagination = Pagination::from_query(&query_params);

    let total = state.tasks.count_tasks(&filter).await?;
    let tasks = state.tasks.find_tasks(&filter, pagination).await?;

    Ok(HttpResponse::Ok().json(TaskPage::new(tasks, pagination, total)))
}

/// Creates a task owned by the caller.
///
/// ## Responses:
/// - `201 Created`: the new task.
/// - `400 Bad Request`: invalid input or unknown assignee.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    context: AuthContext,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    ensure_assignee_exists(&state, task_data.assigned_to).await?;

    let task = Task::new(task_data.into_inner(), context.user.id);
    let created = state.tasks.create_task(task).await?;

    Ok(HttpResponse::Created().json(created))
}

/// Retrieves a task with its creator and assignee resolved.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    _context: AuthContext,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = state
        .tasks
        .find_task_by_id(task_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task.
///
/// ## Responses:
/// - `200 OK`: the updated task.
/// - `403 Forbidden`: the caller is neither admin, creator nor assignee.
/// - `404 Not Found`: no such task.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    context: AuthContext,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskUpdate>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let task_id = task_id.into_inner();

    let existing = state
        .tasks
        .find_task_by_id(task_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    if !existing.task.editable_by(&context.user) {
        return Err(AppError::Forbidden("Not allowed to update this task".into()));
    }
    if task_data.is_empty() {
        return Ok(HttpResponse::Ok().json(existing.task));
    }
    if let Some(assignee) = task_data.assigned_to {
        ensure_assignee_exists(&state, assignee).await?;
    }

    let updated = state
        .tasks
        .update_task_by_id(task_id, &task_data)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes a task. Only its creator or an admin may do so.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    context: AuthContext,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task_id = task_id.into_inner();

    let existing = state
        .tasks
        .find_task_by_id(task_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    if !existing.task.deletable_by(&context.user) {
        return Err(AppError::Forbidden("Not allowed to delete this task".into()));
    }

    if !state.tasks.delete_task_by_id(task_id).await? {
        return Err(AppError::NotFound("Task not found".into()));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Deleted" })))
}

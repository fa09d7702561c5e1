use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{
    NewUser, Pagination, Task, TaskFilter, TaskPriority, TaskStatus, TaskUpdate, TaskView, User,
    UserRecord, UserRef,
};

const USER_COLUMNS: &str = "id, name, email, role, created_at, updated_at";
const TASK_COLUMNS: &str =
    "id, title, description, priority, status, due_date, created_at, updated_at, created_by, assigned_to";

/// Creator and assignee are resolved with a lookup join; a deleted user
/// leaves NULL columns behind.
const TASK_VIEW_SELECT: &str = "SELECT t.id, t.title, t.description, t.priority, t.status, t.due_date, \
     t.created_at, t.updated_at, t.created_by, t.assigned_to, \
     c.name AS creator_name, c.email AS creator_email, \
     a.name AS assignee_name, a.email AS assignee_email \
     FROM tasks t \
     LEFT JOIN users c ON c.id = t.created_by \
     LEFT JOIN users a ON a.id = t.assigned_to";

#[derive(FromRow)]
struct TaskViewRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    priority: TaskPriority,
    status: TaskStatus,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Uuid,
    assigned_to: Option<Uuid>,
    creator_name: Option<String>,
    creator_email: Option<String>,
    assignee_name: Option<String>,
    assignee_email: Option<String>,
}

fn user_ref(id: Uuid, name: Option<String>, email: Option<String>) -> Option<UserRef> {
    match (name, email) {
        (Some(name), Some(email)) => Some(UserRef { id, name, email }),
        _ => None,
    }
}

impl From<TaskViewRow> for TaskView {
    fn from(row: TaskViewRow) -> Self {
        TaskView {
            creator: user_ref(row.created_by, row.creator_name, row.creator_email),
            assignee: row
                .assigned_to
                .and_then(|id| user_ref(id, row.assignee_name, row.assignee_email)),
            task: Task {
                id: row.id,
                title: row.title,
                description: row.description,
                priority: row.priority,
                status: row.status,
                due_date: row.due_date,
                created_at: row.created_at,
                updated_at: row.updated_at,
                created_by: row.created_by,
                assigned_to: row.assigned_to,
            },
        }
    }
}

/// Appends the `WHERE` clause for `filter` with bound parameters.
fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &TaskFilter) {
    query.push(" WHERE TRUE");
    if let Some(assigned_to) = filter.assigned_to {
        query.push(" AND t.assigned_to = ").push_bind(assigned_to);
    }
    if let Some(priority) = filter.priority {
        query.push(" AND t.priority = ").push_bind(priority);
    }
    if let Some(status) = filter.status {
        query.push(" AND t.status = ").push_bind(status);
    }
    if let Some(user_id) = filter.visible_to {
        query
            .push(" AND (t.assigned_to = ")
            .push_bind(user_id)
            .push(" OR t.created_by = ")
            .push_bind(user_id)
            .push(")");
    }
}

/// Newest first; `id` breaks ties so pages never overlap.
fn listing_query(filter: &TaskFilter, pagination: Pagination) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new(TASK_VIEW_SELECT);
    push_filter(&mut query, filter);
    query
        .push(" ORDER BY t.created_at DESC, t.id DESC LIMIT ")
        .push_bind(pagination.limit)
        .push(" OFFSET ")
        .push_bind(pagination.offset());
    query
}

/// Postgres-backed store sharing one connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the migrations under `migrations/`.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("migration failed: {}", e)))?;
        info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, password_hash, role, created_at, updated_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let record = user.into_record();
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(record.role)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE tasks SET assigned_to = NULL, updated_at = now() WHERE assigned_to = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn list_users(&self) -> Result<Vec<UserRef>, AppError> {
        let users = sqlx::query_as::<_, UserRef>("SELECT id, name, email FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn find_tasks(
        &self,
        filter: &TaskFilter,
        pagination: Pagination,
    ) -> Result<Vec<TaskView>, AppError> {
        let rows = listing_query(filter, pagination)
            .build_query_as::<TaskViewRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(TaskView::from).collect())
    }

    async fn count_tasks(&self, filter: &TaskFilter) -> Result<i64, AppError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks t");
        push_filter(&mut query, filter);
        let total = query.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<TaskView>, AppError> {
        let row = sqlx::query_as::<_, TaskViewRow>(&format!("{} WHERE t.id = $1", TASK_VIEW_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(TaskView::from))
    }

    async fn create_task(&self, task: Task) -> Result<Task, AppError> {
        let created = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {cols}",
            cols = TASK_COLUMNS
        ))
        .bind(task.id)
        .bind(task.title)
        .bind(task.description)
        .bind(task.priority)
        .bind(task.status)
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.created_by)
        .bind(task.assigned_to)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_task_by_id(&self, id: Uuid, update: &TaskUpdate) -> Result<Option<Task>, AppError> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = now()");
        if let Some(title) = &update.title {
            query.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &update.description {
            query.push(", description = ").push_bind(description.clone());
        }
        if let Some(priority) = update.priority {
            query.push(", priority = ").push_bind(priority);
        }
        if let Some(status) = update.status {
            query.push(", status = ").push_bind(status);
        }
        if let Some(due_date) = update.due_date {
            query.push(", due_date = ").push_bind(due_date);
        }
        if let Some(assigned_to) = update.assigned_to {
            query.push(", assigned_to = ").push_bind(assigned_to);
        }
        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(TASK_COLUMNS);

        let task = query.build_query_as::<Task>().fetch_optional(&self.pool).await?;
        Ok(task)
    }

    async fn delete_task_by_id(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

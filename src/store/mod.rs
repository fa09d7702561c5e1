//! Persistence seams for users and tasks.
//!
//! Handlers and the auth gate only see the `UserStore` and `TaskStore`
//! traits. `postgres::PgStore` is the production backend; `memory::MemoryStore`
//! backs development runs without a database and the test suite.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewUser, Pagination, Task, TaskFilter, TaskUpdate, TaskView, User, UserRecord, UserRef};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Credential store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Full record including the password hash, for login.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;

    /// Public user without the password hash.
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Fails with `AppError::DuplicateEmail` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    /// Returns `false` if no such user existed. Tasks assigned to the user are
    /// unassigned; tasks the user created are kept.
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;

    async fn list_users(&self) -> Result<Vec<UserRef>, AppError>;
}

/// Task store. Listings are sorted by creation time, newest first.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_tasks(
        &self,
        filter: &TaskFilter,
        pagination: Pagination,
    ) -> Result<Vec<TaskView>, AppError>;

    async fn count_tasks(&self, filter: &TaskFilter) -> Result<i64, AppError>;

    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<TaskView>, AppError>;

    async fn create_task(&self, task: Task) -> Result<Task, AppError>;

    async fn update_task_by_id(&self, id: Uuid, update: &TaskUpdate) -> Result<Option<Task>, AppError>;

    async fn delete_task_by_id(&self, id: Uuid) -> Result<bool, AppError>;
}

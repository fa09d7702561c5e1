use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use super::user::{User, UserRef};

const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 1000;

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Low priority.
    #[default]
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
    /// Urgent priority.
    Urgent,
}

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is yet to be started.
    #[default]
    Todo,
    /// Task is currently being worked on.
    InProgress,
    /// Task is completed and under review.
    Review,
    /// Task is completed.
    Done,
}

impl std::str::FromStr for TaskPriority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "urgent" => Ok(TaskPriority::Urgent),
            other => Err(format!("unknown priority `{}`", other)),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "review" => Ok(TaskStatus::Review),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("unknown status `{}`", other)),
        }
    }
}

/// Input structure for creating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// The title of the task.
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// An optional description for the task.
    /// Maximum length of 1000 characters if provided.
    #[validate(length(max = 1000))]
    pub description: Option<String>,

    /// Defaults to `low`.
    #[serde(default)]
    pub priority: TaskPriority,

    /// Defaults to `todo`.
    #[serde(default)]
    pub status: TaskStatus,

    pub due_date: Option<DateTime<Utc>>,

    /// User the task is assigned to. Must exist.
    pub assigned_to: Option<Uuid>,
}

/// Partial update of a task. Absent fields are left untouched; an explicit
/// `null` clears an optional field.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present")]
    pub assigned_to: Option<Option<Uuid>>,
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl Validate for TaskUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(title) = &self.title {
            let len = title.chars().count();
            if len == 0 || len > TITLE_MAX {
                errors.add("title", ValidationError::new("length"));
            }
        }
        if let Some(Some(description)) = &self.description {
            if description.chars().count() > DESCRIPTION_MAX {
                errors.add("description", ValidationError::new("length"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.due_date.is_none()
            && self.assigned_to.is_none()
    }

    /// Applies the update in place and bumps `updated_at`.
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(assigned_to) = self.assigned_to {
            task.assigned_to = assigned_to;
        }
        task.updated_at = Utc::now();
    }
}

/// Represents a task entity as stored in the database.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Identifier of the user who created the task. Not a foreign key.
    pub created_by: Uuid,
    /// Identifier of the user to whom the task is assigned. Not a foreign key.
    pub assigned_to: Option<Uuid>,
}

impl Task {
    /// Creates a new `Task` from `TaskInput` and the creator's id.
    pub fn new(input: TaskInput, created_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            priority: input.priority,
            status: input.status,
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
            created_by,
            assigned_to: input.assigned_to,
        }
    }

    /// Whether `user_id` is the creator or the assignee of this task.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.created_by == user_id || self.assigned_to == Some(user_id)
    }

    /// Admins, the creator and the assignee may update a task.
    pub fn editable_by(&self, user: &User) -> bool {
        user.is_admin() || self.involves(user.id)
    }

    /// Only admins and the creator may delete a task.
    pub fn deletable_by(&self, user: &User) -> bool {
        user.is_admin() || self.created_by == user.id
    }
}

/// A task with its creator and assignee resolved. A reference to a user that
/// no longer exists resolves to `None`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub creator: Option<UserRef>,
    pub assignee: Option<UserRef>,
}

/// Treats an empty query value (`?priority=`) as absent.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Represents query parameters for listing tasks.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TaskQuery {
    /// 1-based page number.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<i64>,
    /// Page size.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<i64>,
    /// Filter tasks by assignee's user ID.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub assigned_to: Option<Uuid>,
    /// Filter tasks by priority.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub priority: Option<TaskPriority>,
    /// Filter tasks by status.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<TaskStatus>,
    /// Requests the listing without ownership scoping.
    pub all: Option<String>,
}

impl TaskQuery {
    /// Any non-empty `all` value counts as set, `all=0` included.
    pub fn wants_all(&self) -> bool {
        self.all.as_deref().is_some_and(|value| !value.trim().is_empty())
    }
}

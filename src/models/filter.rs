//! Task visibility and pagination.
//!
//! `TaskFilter::for_listing` decides which tasks a listing may return. Admins,
//! and callers passing the `all` override, only get the filters they asked
//! for. Everyone else is additionally restricted to tasks they created or are
//! assigned to.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{Task, TaskPriority, TaskQuery, TaskStatus, TaskView};
use super::user::User;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// Record filter applied by `find_tasks` and `count_tasks`.
///
/// All set fields are combined with AND. `visible_to` is itself the
/// disjunction `assigned_to = id OR created_by = id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub assigned_to: Option<Uuid>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub visible_to: Option<Uuid>,
}

impl TaskFilter {
    pub fn for_listing(user: &User, query: &TaskQuery) -> Self {
        let scoped = !(user.is_admin() || query.wants_all());
        Self {
            assigned_to: query.assigned_to,
            priority: query.priority,
            status: query.status,
            visible_to: scoped.then_some(user.id),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.assigned_to.map_or(true, |id| task.assigned_to == Some(id))
            && self.priority.map_or(true, |p| task.priority == p)
            && self.status.map_or(true, |s| task.status == s)
            && self.visible_to.map_or(true, |id| task.involves(id))
    }
}

/// Page window of a listing, always at least one item wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn from_query(query: &TaskQuery) -> Self {
        Self {
            page: query.page.unwrap_or(1).max(1),
            limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// One page of a task listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskPage {
    pub tasks: Vec<TaskView>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl TaskPage {
    pub fn new(tasks: Vec<TaskView>, pagination: Pagination, total: i64) -> Self {
        Self {
            tasks,
            page: pagination.page,
            limit: pagination.limit,
            total,
            pages: pagination.pages(total),
        }
    }
}

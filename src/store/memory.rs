use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::{TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{NewUser, Pagination, Task, TaskFilter, TaskUpdate, TaskView, User, UserRecord, UserRef};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserRecord>,
    users_by_email: HashMap<String, Uuid>,
    tasks: HashMap<Uuid, Task>,
}

impl Inner {
    fn user_ref(&self, id: Uuid) -> Option<UserRef> {
        self.users.get(&id).map(|u| UserRef {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
        })
    }

    fn view(&self, task: &Task) -> TaskView {
        TaskView {
            task: task.clone(),
            creator: self.user_ref(task.created_by),
            assignee: task.assigned_to.and_then(|id| self.user_ref(id)),
        }
    }
}

/// In-memory store for development and tests. Cloning shares the data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, AppError> {
        self.inner
            .read()
            .map_err(|_| AppError::InternalServerError("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, AppError> {
        self.inner
            .write()
            .map_err(|_| AppError::InternalServerError("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let inner = self.read()?;
        Ok(inner
            .users_by_email
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.read()?.users.get(&id).cloned().map(UserRecord::into_user))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut inner = self.write()?;
        if inner.users_by_email.contains_key(&user.email) {
            return Err(AppError::DuplicateEmail);
        }
        let record = user.into_record();
        inner.users_by_email.insert(record.email.clone(), record.id);
        inner.users.insert(record.id, record.clone());
        Ok(record.into_user())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.write()?;
        let Some(record) = inner.users.remove(&id) else {
            return Ok(false);
        };
        inner.users_by_email.remove(&record.email);
        for task in inner.tasks.values_mut() {
            if task.assigned_to == Some(id) {
                task.assigned_to = None;
            }
        }
        Ok(true)
    }

    async fn list_users(&self) -> Result<Vec<UserRef>, AppError> {
        let inner = self.read()?;
        let mut users: Vec<&UserRecord> = inner.users.values().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users
            .into_iter()
            .map(|u| UserRef {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn find_tasks(
        &self,
        filter: &TaskFilter,
        pagination: Pagination,
    ) -> Result<Vec<TaskView>, AppError> {
        let inner = self.read()?;
        let mut tasks: Vec<&Task> = inner.tasks.values().filter(|t| filter.matches(t)).collect();
        tasks.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(tasks
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit as usize)
            .map(|t| inner.view(t))
            .collect())
    }

    async fn count_tasks(&self, filter: &TaskFilter) -> Result<i64, AppError> {
        let inner = self.read()?;
        Ok(inner.tasks.values().filter(|t| filter.matches(t)).count() as i64)
    }

    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<TaskView>, AppError> {
        let inner = self.read()?;
        Ok(inner.tasks.get(&id).map(|t| inner.view(t)))
    }

    async fn create_task(&self, task: Task) -> Result<Task, AppError> {
        self.write()?.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task_by_id(&self, id: Uuid, update: &TaskUpdate) -> Result<Option<Task>, AppError> {
        let mut inner = self.write()?;
        Ok(inner.tasks.get_mut(&id).map(|task| {
            update.apply(task);
            task.clone()
        }))
    }

    async fn delete_task_by_id(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.write()?.tasks.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, TaskInput, TaskPriority, TaskStatus};
    use pretty_assertions::assert_eq;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: email.split('@').next().unwrap_or_default().to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
        }
    }

    fn task(created_by: Uuid, assigned_to: Option<Uuid>) -> Task {
        Task::new(
            TaskInput {
                title: "task".into(),
                description: None,
                priority: TaskPriority::Low,
                status: TaskStatus::Todo,
                due_date: None,
                assigned_to,
            },
            created_by,
        )
    }

    #[actix_rt::test]
    async fn test_user_lifecycle() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@x.com")).await.unwrap();

        let by_email = store.find_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.password_hash, "hash");
        assert_eq!(store.find_user_by_id(user.id).await.unwrap(), Some(user.clone()));

        assert!(matches!(
            store.create_user(new_user("a@x.com")).await,
            Err(AppError::DuplicateEmail)
        ));

        assert!(store.delete_user(user.id).await.unwrap());
        assert!(!store.delete_user(user.id).await.unwrap());
        assert!(store.find_user_by_email("a@x.com").await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_deleting_user_unassigns_but_keeps_tasks() {
        let store = MemoryStore::new();
        let creator = store.create_user(new_user("c@x.com")).await.unwrap();
        let assignee = store.create_user(new_user("d@x.com")).await.unwrap();

        let assigned = store.create_task(task(creator.id, Some(assignee.id))).await.unwrap();
        let owned = store.create_task(task(assignee.id, None)).await.unwrap();

        store.delete_user(assignee.id).await.unwrap();

        let view = store.find_task_by_id(assigned.id).await.unwrap().unwrap();
        assert_eq!(view.task.assigned_to, None);
        assert_eq!(view.assignee, None);
        assert_eq!(view.creator.map(|c| c.id), Some(creator.id));

        let orphan = store.find_task_by_id(owned.id).await.unwrap().unwrap();
        assert_eq!(orphan.task.created_by, assignee.id);
        assert_eq!(orphan.creator, None);
    }

    #[actix_rt::test]
    async fn test_find_tasks_sorts_and_paginates() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let mut ids = Vec::new();
        for _ in 0..5 {
            let mut t = task(owner, None);
            // distinct, increasing creation times
            t.created_at = chrono::Utc::now() + chrono::Duration::seconds(ids.len() as i64);
            ids.push(store.create_task(t).await.unwrap().id);
        }
        store.create_task(task(Uuid::new_v4(), None)).await.unwrap();

        let filter = TaskFilter {
            visible_to: Some(owner),
            ..Default::default()
        };
        assert_eq!(store.count_tasks(&filter).await.unwrap(), 5);

        let first = store
            .find_tasks(&filter, Pagination { page: 1, limit: 2 })
            .await
            .unwrap();
        let first_ids: Vec<Uuid> = first.iter().map(|v| v.task.id).collect();
        assert_eq!(first_ids, vec![ids[4], ids[3]]);

        let last = store
            .find_tasks(&filter, Pagination { page: 3, limit: 2 })
            .await
            .unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].task.id, ids[0]);
    }

    #[actix_rt::test]
    async fn test_equal_timestamps_page_without_overlap() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let at = chrono::Utc::now();
        let mut ids = Vec::new();
        for _ in 0..4 {
            let mut t = task(owner, None);
            t.created_at = at;
            ids.push(store.create_task(t).await.unwrap().id);
        }
        ids.sort_by(|a, b| b.cmp(a));

        let filter = TaskFilter {
            visible_to: Some(owner),
            ..Default::default()
        };
        let mut paged = Vec::new();
        for page in 1..=2 {
            let views = store
                .find_tasks(&filter, Pagination { page, limit: 2 })
                .await
                .unwrap();
            paged.extend(views.into_iter().map(|v| v.task.id));
        }
        assert_eq!(paged, ids);
    }

    #[actix_rt::test]
    async fn test_update_and_delete_missing_task() {
        let store = MemoryStore::new();
        let update = TaskUpdate {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        assert_eq!(store.update_task_by_id(Uuid::new_v4(), &update).await.unwrap(), None);
        assert!(!store.delete_task_by_id(Uuid::new_v4()).await.unwrap());

        let created = store.create_task(task(Uuid::new_v4(), None)).await.unwrap();
        let updated = store.update_task_by_id(created.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.status, TaskStatus::Done);
        assert!(store.delete_task_by_id(created.id).await.unwrap());
    }
}

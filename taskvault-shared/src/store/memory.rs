//! In-memory backend used by tests and local runs without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{Store, StoreError, StoreResult, TaskStore, UserStore};
use crate::models::task::{NewTask, Task, TaskFilter, TaskStatus};
use crate::models::user::{CreateUser, User};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    next_user_id: i64,
    next_task_id: i64,
}

/// Store keeping everything in ordered maps behind a single lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.username == data.username) {
            return Err(StoreError::Duplicate("username"));
        }
        if tables.users.values().any(|u| u.email == data.email) {
            return Err(StoreError::Duplicate("email"));
        }

        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, data: NewTask) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;

        tables.next_task_id += 1;
        let now = Utc::now();
        let task = Task {
            id: tables.next_task_id,
            user_id: data.user_id,
            title: data.title,
            description: data.description,
            priority: data.priority,
            status: TaskStatus::Pending,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.insert(task.id, task.clone());

        Ok(task)
    }

    async fn task_owned(&self, id: i64, user_id: i64) -> StoreResult<Option<Task>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .get(&id)
            .filter(|t| t.user_id == user_id)
            .cloned())
    }

    async fn tasks_owned(
        &self,
        user_id: i64,
        filter: TaskFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Task>, i64)> {
        let tables = self.tables.read().await;

        let matching: Vec<&Task> = tables
            .tasks
            .values()
            .rev()
            .filter(|t| t.user_id == user_id && filter.matches(t))
            .collect();

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.write().await;

        let Some(stored) = tables.tasks.get_mut(&task.id) else {
            return Ok(None);
        };
        if stored.user_id != task.user_id || stored.version != task.version {
            return Ok(None);
        }

        stored.title = task.title.clone();
        stored.description = task.description.clone();
        stored.priority = task.priority;
        stored.status = task.status;
        stored.version += 1;
        stored.updated_at = Utc::now();

        Ok(Some(stored.clone()))
    }

    async fn delete_task(&self, id: i64, user_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        match tables.tasks.get(&id) {
            Some(task) if task.user_id == user_id => {
                tables.tasks.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

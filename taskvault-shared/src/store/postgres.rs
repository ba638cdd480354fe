//! PostgreSQL backend.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{Store, StoreError, StoreResult, TaskStore, UserStore};
use crate::db::pool::health_check;
use crate::models::task::{NewTask, Task, TaskFilter};
use crate::models::user::{CreateUser, User};

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a unique violation on the users table to the field it concerns
fn map_user_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(name) if name.contains("email") => "email",
                _ => "username",
            };
            return StoreError::Duplicate(field);
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, data)
            .await
            .map_err(map_user_insert_error)
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_username(&self.pool, username).await?)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, data: NewTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn task_owned(&self, id: i64, user_id: i64) -> StoreResult<Option<Task>> {
        Ok(Task::find_owned(&self.pool, id, user_id).await?)
    }

    async fn tasks_owned(
        &self,
        user_id: i64,
        filter: TaskFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Task>, i64)> {
        let total = Task::count_owned(&self.pool, user_id, &filter).await?;
        let tasks = Task::list_owned(&self.pool, user_id, &filter, limit, offset).await?;
        Ok((tasks, total))
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Option<Task>> {
        Ok(Task::update_versioned(&self.pool, task).await?)
    }

    async fn delete_task(&self, id: i64, user_id: i64) -> StoreResult<bool> {
        Ok(Task::delete_owned(&self.pool, id, user_id).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}

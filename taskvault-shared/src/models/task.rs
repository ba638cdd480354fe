/// Task model and database operations
///
/// Every query here is scoped by owner: a task is only ever read, changed or
/// removed together with the `user_id` it belongs to.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     priority VARCHAR(10) NOT NULL DEFAULT 'medium',  -- low|medium|high
///     status VARCHAR(12) NOT NULL DEFAULT 'pending',   -- pending|completed
///     version BIGINT NOT NULL DEFAULT 1,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;

/// Rejected enum value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} must be {allowed}")]
pub struct ParseEnumError {
    kind: &'static str,
    allowed: &'static str,
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = ParseEnumError;

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err(ParseEnumError {
                kind: "priority",
                allowed: "low|medium|high",
            }),
        }
    }
}

impl TryFrom<String> for TaskPriority {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task completion status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(ParseEnumError {
                kind: "status",
                allowed: "pending|completed",
            }),
        }
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task owned by exactly one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: i64,

    /// Owning user; never changes after creation
    pub user_id: i64,

    /// Non-empty, trimmed title
    pub title: String,

    /// Optional trimmed description
    pub description: Option<String>,

    #[sqlx(try_from = "String")]
    pub priority: TaskPriority,

    #[sqlx(try_from = "String")]
    pub status: TaskStatus,

    /// Incremented on every successful update
    pub version: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a task (already validated)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
}

/// Optional filters for listing an owner's tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl TaskFilter {
    /// Whether `task` passes this filter (owner is checked separately)
    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |status| task.status == status)
            && self.priority.map_or(true, |priority| task.priority == priority)
    }
}

/// One field of a partial update: either left alone or replaced
///
/// Deserializes from a present JSON value as `Set`; pair it with
/// `#[serde(default)]` so an absent key becomes `Unchanged`. Use
/// `FieldUpdate<Option<T>>` for clearable fields, where JSON `null` is
/// `Set(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    #[default]
    Unchanged,
    Set(T),
}

impl<T> FieldUpdate<T> {
    /// Converts the carried value, keeping `Unchanged` as is
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<FieldUpdate<U>, E> {
        match self {
            FieldUpdate::Unchanged => Ok(FieldUpdate::Unchanged),
            FieldUpdate::Set(value) => f(value).map(FieldUpdate::Set),
        }
    }

    /// Writes the carried value into `slot`, if any
    pub fn apply_to(self, slot: &mut T) {
        if let FieldUpdate::Set(value) = self {
            *slot = value;
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldUpdate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(FieldUpdate::Set)
    }
}

const TASK_COLUMNS: &str =
    "id, user_id, title, description, priority, status, version, created_at, updated_at";

fn filter_clause(filter: &TaskFilter, first_bind: usize) -> String {
    let mut clause = String::new();
    let mut bind = first_bind;

    if filter.status.is_some() {
        clause.push_str(&format!(" AND status = ${}", bind));
        bind += 1;
    }
    if filter.priority.is_some() {
        clause.push_str(&format!(" AND priority = ${}", bind));
    }

    clause
}

impl Task {
    /// Inserts a new pending task
    pub async fn create(pool: &PgPool, data: NewTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (user_id, title, description, priority) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.user_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.priority.as_str())
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID, only if owned by `user_id`
    pub async fn find_owned(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists an owner's tasks, newest (highest ID) first
    pub async fn list_owned(
        pool: &PgPool,
        user_id: i64,
        filter: &TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let clause = filter_clause(filter, 2);
        let bind_offset = 2 + filter.status.is_some() as usize + filter.priority.is_some() as usize;
        let query = format!(
            "SELECT {} FROM tasks WHERE user_id = $1{} ORDER BY id DESC LIMIT ${} OFFSET ${}",
            TASK_COLUMNS,
            clause,
            bind_offset,
            bind_offset + 1
        );

        let mut q = sqlx::query_as::<_, Task>(&query).bind(user_id);
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority.as_str());
        }

        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Counts an owner's tasks matching `filter`
    pub async fn count_owned(
        pool: &PgPool,
        user_id: i64,
        filter: &TaskFilter,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM tasks WHERE user_id = $1{}",
            filter_clause(filter, 2)
        );

        let mut q = sqlx::query_as::<_, (i64,)>(&query).bind(user_id);
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority.as_str());
        }

        let (count,) = q.fetch_one(pool).await?;
        Ok(count)
    }

    /// Writes the mutable fields of `task` if the stored version still equals
    /// `task.version`
    ///
    /// Returns the updated row (with a bumped version), or `None` if the task
    /// is gone, owned by someone else, or was changed concurrently.
    pub async fn update_versioned(pool: &PgPool, task: &Task) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks \
             SET title = $4, description = $5, priority = $6, status = $7, \
                 version = version + 1, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND version = $3 \
             RETURNING {}",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(task.id)
            .bind(task.user_id)
            .bind(task.version)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Deletes a task owned by `user_id`
    ///
    /// Returns true if a row was removed.
    pub async fn delete_owned(pool: &PgPool, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

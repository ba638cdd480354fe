/// Persistence contracts for users and tasks
///
/// The directory and task services only talk to these traits, so the same
/// business logic runs against PostgreSQL in production and an in-memory
/// backend in tests.
///
/// # Contract
///
/// Every implementation must:
/// 1. Assign strictly increasing, never-reused IDs to users and tasks
/// 2. Reject a second user with the same username or the same (lowercased)
///    email with [`StoreError::Duplicate`]
/// 3. Scope every task read, update and delete by owner, so a task owned by
///    someone else behaves exactly like a missing one
/// 4. Apply a task update only if the stored version matches the caller's,
///    bumping the version on success
///
/// # Implementations
///
/// - [`postgres::PgStore`]: `sqlx` over a [`PgPool`](sqlx::PgPool)
/// - [`memory::MemoryStore`]: `tokio` `RwLock` over ordered maps

use async_trait::async_trait;

use crate::models::task::{NewTask, Task, TaskFilter};
use crate::models::user::{CreateUser, User};

pub mod memory;
pub mod postgres;

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique field is already taken
    #[error("Duplicate {0}")]
    Duplicate(&'static str),

    /// Backend failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user, failing with `Duplicate("username")` or
    /// `Duplicate("email")` on a uniqueness clash
    async fn insert_user(&self, data: CreateUser) -> StoreResult<User>;

    /// Exact, case-sensitive match
    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Matches against the stored lowercased email
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
}

/// Owner-scoped task persistence
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, data: NewTask) -> StoreResult<Task>;

    /// Returns the task only if `user_id` owns it
    async fn task_owned(&self, id: i64, user_id: i64) -> StoreResult<Option<Task>>;

    /// One page of the owner's matching tasks, newest first, plus the total
    /// number of matches
    async fn tasks_owned(
        &self,
        user_id: i64,
        filter: TaskFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Task>, i64)>;

    /// Compare-and-swap write keyed on `task.version`
    ///
    /// Returns `None` when the task is missing, not owned by `task.user_id`,
    /// or its stored version has moved on.
    async fn update_task(&self, task: &Task) -> StoreResult<Option<Task>>;

    /// Returns true if an owned task was removed
    async fn delete_task(&self, id: i64, user_id: i64) -> StoreResult<bool>;
}

/// A complete backend: both stores plus a liveness probe
#[async_trait]
pub trait Store: UserStore + TaskStore {
    /// Cheap connectivity check for `/health`
    async fn ping(&self) -> StoreResult<()>;
}

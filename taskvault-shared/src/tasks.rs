/// Owner-scoped task operations
///
/// Every method takes the caller's [`AuthContext`]; the owner of a task is
/// always the authenticated user and never comes from request input. A task
/// owned by someone else is indistinguishable from one that does not exist.
///
/// # Updates
///
/// Updates are partial: each field is a [`FieldUpdate`]. The patch is
/// validated once, then applied to the freshly loaded task and written with a
/// version check. If another writer got there first the task is reloaded and
/// the patch re-applied, up to [`MAX_UPDATE_ATTEMPTS`] times.
///
/// ```text
/// load(id, owner) ── None ──> NotFound
///   └─> validate patch ── errors ──> Validation
///         └─> apply ─> write if version matches
///               ├─ written ──> Ok(task)
///               └─ stale ──> reload, retry (max 3) ──> Conflict
/// ```

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::auth::AuthContext;
use crate::models::task::{FieldUpdate, NewTask, Task, TaskFilter, TaskPriority, TaskStatus};
use crate::store::{StoreError, TaskStore};
use crate::validation::FieldError;

/// Page size used when none (or an out-of-range one) is requested
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest accepted page size
pub const MAX_PAGE_SIZE: i64 = 100;

/// Longest accepted title, in characters
pub const MAX_TITLE_LENGTH: usize = 255;

/// How many times an update is attempted before reporting a conflict
pub const MAX_UPDATE_ATTEMPTS: usize = 3;

/// Task error types
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Input rejected
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    /// Missing or owned by another user
    #[error("Task not found")]
    NotFound,

    /// Concurrent writers kept winning
    #[error("Task was modified concurrently, retry the request")]
    Conflict,

    /// Backend failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Body of a create request
#[derive(Debug, Clone, Deserialize)]
pub struct NewTaskInput {
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// `low`, `medium` or `high`, any case; empty or absent means medium
    #[serde(default)]
    pub priority: Option<String>,
}

/// Query string of a list request
///
/// `page` and `page_size` are lenient: empty or non-numeric values read as
/// absent and take the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskQuery {
    pub status: Option<String>,
    pub priority: Option<String>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub page: Option<i64>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub page_size: Option<i64>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

/// Body of an update request; absent keys leave the field alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskChanges {
    #[serde(default)]
    pub title: FieldUpdate<String>,

    /// `null` clears the description
    #[serde(default)]
    pub description: FieldUpdate<Option<String>>,

    #[serde(default)]
    pub status: FieldUpdate<String>,

    #[serde(default)]
    pub priority: FieldUpdate<String>,
}

/// Page metadata returned with a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// One page of tasks
#[derive(Debug, Clone, Serialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub pagination: Pagination,
}

/// A validated update, ready to apply to any version of the task
#[derive(Debug, Clone)]
struct Patch {
    title: FieldUpdate<String>,
    description: FieldUpdate<Option<String>>,
    status: FieldUpdate<TaskStatus>,
    priority: FieldUpdate<TaskPriority>,
}

impl Patch {
    fn apply(self, task: &mut Task) {
        self.title.apply_to(&mut task.title);
        self.description.apply_to(&mut task.description);
        self.status.apply_to(&mut task.status);
        self.priority.apply_to(&mut task.priority);
    }
}

fn check_title(raw: &str, errors: &mut Vec<FieldError>) -> String {
    let title = raw.trim();
    if title.is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
    } else if title.chars().count() > MAX_TITLE_LENGTH {
        errors.push(FieldError::new("title", "Title must be at most 255 characters"));
    }
    title.to_string()
}

fn clean_description(raw: Option<String>) -> Option<String> {
    raw.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())
}

/// Parses an optional enum field, treating empty input as absent
fn parse_optional<T: std::str::FromStr>(
    field: &str,
    raw: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(FieldError::new(field, e.to_string()));
            None
        }
    }
}

fn into_result<T>(value: T, errors: Vec<FieldError>) -> Result<T, TaskError> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(TaskError::Validation(errors))
    }
}

impl TaskChanges {
    fn validate(self) -> Result<Patch, TaskError> {
        let mut errors = Vec::new();

        let title = self.title.try_map(|raw| {
            let mut field = Vec::new();
            let title = check_title(&raw, &mut field);
            if field.is_empty() {
                Ok(title)
            } else {
                Err(field)
            }
        });
        let title = title.unwrap_or_else(|mut e| {
            errors.append(&mut e);
            FieldUpdate::Unchanged
        });

        let status = self
            .status
            .try_map(|raw| raw.parse::<TaskStatus>())
            .unwrap_or_else(|e| {
                errors.push(FieldError::new("status", e.to_string()));
                FieldUpdate::Unchanged
            });

        let priority = self
            .priority
            .try_map(|raw| raw.parse::<TaskPriority>())
            .unwrap_or_else(|e| {
                errors.push(FieldError::new("priority", e.to_string()));
                FieldUpdate::Unchanged
            });

        let description = match self.description {
            FieldUpdate::Set(raw) => FieldUpdate::Set(clean_description(raw)),
            FieldUpdate::Unchanged => FieldUpdate::Unchanged,
        };

        into_result(
            Patch {
                title,
                description,
                status,
                priority,
            },
            errors,
        )
    }
}

/// Task operations over a [`TaskStore`]
#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskStore>) -> Self {
        Self { tasks }
    }

    /// Creates a pending task owned by the caller
    pub async fn create(&self, owner: &AuthContext, input: NewTaskInput) -> Result<Task, TaskError> {
        let mut errors = Vec::new();
        let title = check_title(&input.title, &mut errors);
        let priority = parse_optional::<TaskPriority>("priority", input.priority.as_deref(), &mut errors)
            .unwrap_or_default();

        let data = into_result(
            NewTask {
                user_id: owner.user_id(),
                title,
                description: clean_description(input.description),
                priority,
            },
            errors,
        )?;

        let task = self.tasks.insert_task(data).await?;
        info!(user_id = owner.user_id(), task_id = task.id, "Task created");
        Ok(task)
    }

    /// Lists the caller's tasks, newest first
    ///
    /// A page below 1 falls back to 1; a page size outside
    /// 1..=[`MAX_PAGE_SIZE`] falls back to [`DEFAULT_PAGE_SIZE`].
    pub async fn list(&self, owner: &AuthContext, query: TaskQuery) -> Result<TaskPage, TaskError> {
        let mut errors = Vec::new();
        let filter = TaskFilter {
            status: parse_optional("status", query.status.as_deref(), &mut errors),
            priority: parse_optional("priority", query.priority.as_deref(), &mut errors),
        };
        let filter = into_result(filter, errors)?;

        let page = query.page.filter(|p| *p >= 1).unwrap_or(1);
        let page_size = query
            .page_size
            .filter(|s| (1..=MAX_PAGE_SIZE).contains(s))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(page_size);

        debug!(user_id = owner.user_id(), page, page_size, "Listing tasks");
        let (tasks, total) = self
            .tasks
            .tasks_owned(owner.user_id(), filter, page_size, offset)
            .await?;

        Ok(TaskPage {
            tasks,
            pagination: Pagination {
                page,
                page_size,
                total,
                total_pages: (total + page_size - 1) / page_size,
            },
        })
    }

    /// Applies a partial update to one of the caller's tasks
    ///
    /// # Errors
    ///
    /// - `NotFound` if the task is missing or owned by someone else
    /// - `Validation` if any supplied field is invalid; nothing is written
    /// - `Conflict` if every attempt lost a race with another writer
    pub async fn update(
        &self,
        owner: &AuthContext,
        task_id: i64,
        changes: TaskChanges,
    ) -> Result<Task, TaskError> {
        let mut current = self
            .tasks
            .task_owned(task_id, owner.user_id())
            .await?
            .ok_or(TaskError::NotFound)?;

        let patch = changes.validate()?;

        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let mut next = current.clone();
            patch.clone().apply(&mut next);

            if let Some(updated) = self.tasks.update_task(&next).await? {
                info!(user_id = owner.user_id(), task_id, version = updated.version, "Task updated");
                return Ok(updated);
            }

            debug!(task_id, attempt, "Stale task version, reloading");
            current = self
                .tasks
                .task_owned(task_id, owner.user_id())
                .await?
                .ok_or(TaskError::NotFound)?;
        }

        warn!(task_id, "Giving up on task update after concurrent modifications");
        Err(TaskError::Conflict)
    }

    /// Deletes one of the caller's tasks
    pub async fn delete(&self, owner: &AuthContext, task_id: i64) -> Result<(), TaskError> {
        if self.tasks.delete_task(task_id, owner.user_id()).await? {
            info!(user_id = owner.user_id(), task_id, "Task deleted");
            Ok(())
        } else {
            Err(TaskError::NotFound)
        }
    }
}

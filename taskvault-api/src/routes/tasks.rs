/// Task endpoints
///
/// All handlers sit behind the bearer gate and act on the caller's own tasks
/// only; a task owned by another user answers 404.
///
/// # Endpoints
///
/// - `GET /api/tasks?status=&priority=&page=&page_size=` - List, newest first
/// - `POST /api/tasks` - Create
/// - `PUT /api/tasks/:id` - Partial update
/// - `DELETE /api/tasks/:id` - Delete

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Serialize;
use taskvault_shared::{
    auth::AuthContext,
    models::task::Task,
    tasks::{NewTaskInput, TaskChanges, TaskPage, TaskQuery},
};

/// Delete response
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: i64,
}

/// Create a task
///
/// ```text
/// POST /api/tasks
/// Authorization: Bearer <token>
///
/// { "title": "Buy milk", "description": "2 litres", "priority": "high" }
/// ```
///
/// Returns `201 Created` with the task. `400` if the title is empty or the
/// priority unknown.
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<NewTaskInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let Json(input) = payload?;
    let task = state.tasks.create(&auth, input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// List the caller's tasks
///
/// Returns `{ "tasks": [...], "pagination": { "page", "page_size", "total", "total_pages" } }`.
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> ApiResult<Json<TaskPage>> {
    let Query(query) = query?;
    Ok(Json(state.tasks.list(&auth, query).await?))
}

/// Update some fields of a task
///
/// Absent keys are left alone; `"description": null` clears the description.
/// `409 Conflict` if concurrent writers kept winning.
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TaskChanges>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let Path(id) = id?;
    let Json(changes) = payload?;
    Ok(Json(state.tasks.update(&auth, id, changes).await?))
}

/// Delete a task
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<DeletedResponse>> {
    let Path(id) = id?;
    state.tasks.delete(&auth, id).await?;
    Ok(Json(DeletedResponse { id }))
}

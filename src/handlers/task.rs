//! Task handlers for assignees
//!
//! Employees see the tasks assigned to them, move them along and comment.
//! The assigning manager may read and comment too.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::entity::task::{self, TaskStatus};
use crate::entity::task_comment;
use crate::error::{require, AppError, AppResult, OptionExt};
use crate::middleware::auth::CurrentUser;
use crate::permission::perm;
use crate::routes::ApiResponse;
use crate::state::AppState;

const MAX_COMMENT_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct MyTasksQuery {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: task::Model,
    pub comments: Vec<task_comment::Model>,
}

/// Set `status`, stamping `completed_at` on completion and clearing it
/// when a task is reopened.
pub(crate) fn apply_status(
    active: &mut task::ActiveModel,
    previous: TaskStatus,
    next: TaskStatus,
    now: DateTime<Utc>,
) {
    active.status = Set(next);
    match (previous, next) {
        (TaskStatus::Completed, TaskStatus::Completed) => {}
        (_, TaskStatus::Completed) => active.completed_at = Set(Some(now)),
        _ => active.completed_at = Set(None),
    }
}

/// Task where the caller is the assignee or the assigner.
async fn find_involved(state: &AppState, user: &CurrentUser, id: i64) -> AppResult<task::Model> {
    user.require(perm::TASKS_SELF)?;
    task::Entity::find_by_id(id)
        .filter(task::Column::OrganizationId.eq(user.organization_id))
        .filter(
            Condition::any()
                .add(task::Column::AssignedTo.eq(user.id))
                .add(task::Column::AssignedBy.eq(user.id)),
        )
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Task {} not found", id))
}

/// GET /api/tasks/me
pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MyTasksQuery>,
) -> AppResult<Json<ApiResponse<Vec<task::Model>>>> {
    user.require(perm::TASKS_SELF)?;

    let mut select = task::Entity::find()
        .filter(task::Column::OrganizationId.eq(user.organization_id))
        .filter(task::Column::AssignedTo.eq(user.id));
    if let Some(status) = query.status {
        select = select.filter(task::Column::Status.eq(status));
    }
    let tasks = select
        .order_by_asc(task::Column::Deadline)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(ApiResponse::success(tasks)))
}

/// GET /api/tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<TaskDetail>>> {
    let task = find_involved(&state, &user, id).await?;
    let comments = task_comment::Entity::find()
        .filter(task_comment::Column::TaskId.eq(task.id))
        .order_by_asc(task_comment::Column::CreatedAt)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(ApiResponse::success(TaskDetail { task, comments })))
}

/// PATCH /api/tasks/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<task::Model>>> {
    let task = find_involved(&state, &user, id).await?;
    if task.assigned_to != user.id {
        return Err(AppError::Forbidden(
            "only the assignee can change the task status".to_string(),
        ));
    }

    let now = Utc::now();
    let previous = task.status;
    let mut active = task.into_active_model();
    apply_status(&mut active, previous, req.status, now);
    active.updated_at = Set(now);
    let task = active.update(state.db.as_ref()).await?;

    tracing::info!(
        "Employee {} moved task {} to {:?}",
        user.email,
        task.id,
        task.status
    );
    Ok(Json(ApiResponse::success(task)))
}

/// POST /api/tasks/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> AppResult<Json<ApiResponse<task_comment::Model>>> {
    let task = find_involved(&state, &user, id).await?;
    require(&req.text, "text")?;
    if req.text.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "comment cannot exceed {} characters",
            MAX_COMMENT_CHARS
        )));
    }

    let comment = task_comment::ActiveModel {
        task_id: Set(task.id),
        author_id: Set(user.id),
        author_name: Set(user.name.clone()),
        text: Set(req.text.trim().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(state.db.as_ref())
    .await?;

    tracing::info!("Employee {} commented on task {}", user.email, task.id);
    Ok(Json(ApiResponse::success(comment)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveValue;

    #[test]
    fn completing_stamps_and_reopening_clears() {
        let now = Utc::now();
        let mut active = <task::ActiveModel as Default>::default();
        apply_status(&mut active, TaskStatus::InProgress, TaskStatus::Completed, now);
        assert_eq!(active.completed_at, ActiveValue::Set(Some(now)));

        let mut active = <task::ActiveModel as Default>::default();
        apply_status(&mut active, TaskStatus::Completed, TaskStatus::InProgress, now);
        assert_eq!(active.completed_at, ActiveValue::Set(None));
        assert_eq!(active.status, ActiveValue::Set(TaskStatus::InProgress));
    }

    #[test]
    fn completed_twice_keeps_original_stamp() {
        let now = Utc::now();
        let mut active = <task::ActiveModel as Default>::default();
        apply_status(&mut active, TaskStatus::Completed, TaskStatus::Completed, now);
        assert_eq!(active.completed_at, ActiveValue::NotSet);
    }
}

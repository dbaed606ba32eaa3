//! Manager panel handlers
//!
//! A manager's team is every other active employee of the manager's
//! department. Tasks and reviews can only target team members.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entity::employee::EmployeeStatus;
use crate::entity::task::{TaskPriority, TaskStatus};
use crate::entity::{attendance, attendance_log, employee, review, task, task_comment};
use crate::error::{require, AppError, AppResult, OptionExt};
use crate::handlers::task::apply_status;
use crate::middleware::auth::CurrentUser;
use crate::permission::perm;
use crate::routes::ApiResponse;
use crate::score::{self, PerformanceScore};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub assigned_to: i64,
    pub deadline: DateTime<Utc>,
    pub priority: Option<TaskPriority>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<i64>,
    pub deadline: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ListReviewsQuery {
    pub employee_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub employee_id: i64,
    pub score: i32,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct MemberPerformance {
    pub employee_id: i64,
    pub name: String,
    pub email: String,
    #[serde(flatten)]
    pub score: PerformanceScore,
}

/// Active members of the manager's department, the manager excluded.
async fn team_of(state: &AppState, user: &CurrentUser) -> AppResult<Vec<employee::Model>> {
    user.require(perm::TEAM_MANAGE)?;
    let Some(department_id) = user.department_id else {
        return Ok(Vec::new());
    };
    Ok(employee::Entity::find()
        .filter(employee::Column::OrganizationId.eq(user.organization_id))
        .filter(employee::Column::DepartmentId.eq(department_id))
        .filter(employee::Column::Status.eq(EmployeeStatus::Active))
        .filter(employee::Column::Id.ne(user.id))
        .order_by_asc(employee::Column::LastName)
        .all(state.db.as_ref())
        .await?)
}

async fn team_member(state: &AppState, user: &CurrentUser, id: i64) -> AppResult<employee::Model> {
    team_of(state, user)
        .await?
        .into_iter()
        .find(|e| e.id == id)
        .ok_or_else(|| AppError::Forbidden(format!("employee {} is not in your team", id)))
}

async fn find_own_task(state: &AppState, user: &CurrentUser, id: i64) -> AppResult<task::Model> {
    task::Entity::find_by_id(id)
        .filter(task::Column::OrganizationId.eq(user.organization_id))
        .filter(task::Column::AssignedBy.eq(user.id))
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Task {} not found", id))
}

/// Composite scores for the given employees, loading each data set once.
pub(crate) async fn load_scores<C: ConnectionTrait>(
    db: &C,
    employee_ids: &[i64],
    now: DateTime<Utc>,
) -> AppResult<HashMap<i64, PerformanceScore>> {
    let ids = employee_ids.to_vec();

    let mut reviews: HashMap<i64, Vec<review::Model>> = HashMap::new();
    for r in review::Entity::find()
        .filter(review::Column::EmployeeId.is_in(ids.clone()))
        .all(db)
        .await?
    {
        reviews.entry(r.employee_id).or_default().push(r);
    }

    let mut tasks: HashMap<i64, Vec<task::Model>> = HashMap::new();
    for t in task::Entity::find()
        .filter(task::Column::AssignedTo.is_in(ids.clone()))
        .all(db)
        .await?
    {
        tasks.entry(t.assigned_to).or_default().push(t);
    }

    let sheets: HashMap<i64, i64> = attendance::Entity::find()
        .filter(attendance::Column::EmployeeId.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.id, a.employee_id))
        .collect();
    let mut logs: HashMap<i64, Vec<attendance_log::Model>> = HashMap::new();
    for l in attendance_log::Entity::find()
        .filter(attendance_log::Column::AttendanceId.is_in(sheets.keys().copied().collect::<Vec<_>>()))
        .all(db)
        .await?
    {
        if let Some(employee_id) = sheets.get(&l.attendance_id) {
            logs.entry(*employee_id).or_default().push(l);
        }
    }

    Ok(employee_ids
        .iter()
        .map(|id| {
            let score = score::evaluate(
                reviews.get(id).map(Vec::as_slice).unwrap_or_default(),
                tasks.get(id).map(Vec::as_slice).unwrap_or_default(),
                logs.get(id).map(Vec::as_slice).unwrap_or_default(),
                now,
            );
            (*id, score)
        })
        .collect())
}

fn member_performance(emp: &employee::Model, score: PerformanceScore) -> MemberPerformance {
    MemberPerformance {
        employee_id: emp.id,
        name: emp.full_name(),
        email: emp.email.clone(),
        score,
    }
}

/// GET /api/manager/team
pub async fn team(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<employee::Model>>>> {
    let members = team_of(&state, &user).await?;
    Ok(Json(ApiResponse::success(members)))
}

/// GET /api/manager/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListTasksQuery>,
) -> AppResult<Json<ApiResponse<Vec<task::Model>>>> {
    user.require(perm::TASKS_MANAGE)?;

    let mut select = task::Entity::find()
        .filter(task::Column::OrganizationId.eq(user.organization_id))
        .filter(task::Column::AssignedBy.eq(user.id));
    if let Some(status) = query.status {
        select = select.filter(task::Column::Status.eq(status));
    }
    if let Some(assignee) = query.assigned_to {
        select = select.filter(task::Column::AssignedTo.eq(assignee));
    }
    let tasks = select
        .order_by_asc(task::Column::Deadline)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(ApiResponse::success(tasks)))
}

/// POST /api/manager/tasks
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateTaskRequest>,
) -> AppResult<Json<ApiResponse<task::Model>>> {
    user.require(perm::TASKS_MANAGE)?;
    require(&req.title, "title")?;
    let assignee = team_member(&state, &user, req.assigned_to).await?;

    let now = Utc::now();
    let task = task::ActiveModel {
        organization_id: Set(user.organization_id),
        title: Set(req.title.trim().to_string()),
        description: Set(req.description),
        assigned_to: Set(assignee.id),
        assigned_by: Set(user.id),
        deadline: Set(req.deadline),
        priority: Set(req.priority.unwrap_or(TaskPriority::Medium)),
        status: Set(TaskStatus::Pending),
        completed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(state.db.as_ref())
    .await?;

    tracing::info!(
        "Manager {} assigned task {} to {}",
        user.email,
        task.id,
        assignee.email
    );
    Ok(Json(ApiResponse::success(task)))
}

/// PATCH /api/manager/tasks/:id
pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTaskRequest>,
) -> AppResult<Json<ApiResponse<task::Model>>> {
    user.require(perm::TASKS_MANAGE)?;
    let current = find_own_task(&state, &user, id).await?;
    let now = Utc::now();

    let mut active = current.clone().into_active_model();
    if let Some(title) = req.title {
        require(&title, "title")?;
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = req.description {
        active.description = Set(description);
    }
    if let Some(assignee) = req.assigned_to {
        let member = team_member(&state, &user, assignee).await?;
        active.assigned_to = Set(member.id);
    }
    if let Some(deadline) = req.deadline {
        active.deadline = Set(deadline);
    }
    if let Some(priority) = req.priority {
        active.priority = Set(priority);
    }
    if let Some(status) = req.status {
        apply_status(&mut active, current.status, status, now);
    }
    active.updated_at = Set(now);
    let task = active.update(state.db.as_ref()).await?;

    tracing::info!("Manager {} updated task {}", user.email, task.id);
    Ok(Json(ApiResponse::success(task)))
}

/// DELETE /api/manager/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require(perm::TASKS_MANAGE)?;
    let task = find_own_task(&state, &user, id).await?;

    task_comment::Entity::delete_many()
        .filter(task_comment::Column::TaskId.eq(task.id))
        .exec(state.db.as_ref())
        .await?;
    task::Entity::delete_by_id(task.id).exec(state.db.as_ref()).await?;

    tracing::info!("Manager {} deleted task {}", user.email, task.id);
    Ok(Json(ApiResponse::success_msg("task deleted")))
}

/// GET /api/manager/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListReviewsQuery>,
) -> AppResult<Json<ApiResponse<Vec<review::Model>>>> {
    user.require(perm::REVIEWS_MANAGE)?;

    let mut select = review::Entity::find()
        .filter(review::Column::OrganizationId.eq(user.organization_id))
        .filter(review::Column::ManagerId.eq(user.id));
    if let Some(employee_id) = query.employee_id {
        select = select.filter(review::Column::EmployeeId.eq(employee_id));
    }
    let reviews = select
        .order_by_desc(review::Column::CreatedAt)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(ApiResponse::success(reviews)))
}

/// POST /api/manager/reviews
pub async fn create_review(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateReviewRequest>,
) -> AppResult<Json<ApiResponse<review::Model>>> {
    user.require(perm::REVIEWS_MANAGE)?;
    if !review::is_valid_score(req.score) {
        return Err(AppError::Validation(format!(
            "score must be between {} and {}",
            review::MIN_SCORE,
            review::MAX_SCORE
        )));
    }
    let member = team_member(&state, &user, req.employee_id).await?;

    let review = review::ActiveModel {
        organization_id: Set(user.organization_id),
        employee_id: Set(member.id),
        manager_id: Set(user.id),
        score: Set(req.score),
        comment: Set(req.comment),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(state.db.as_ref())
    .await?;

    tracing::info!(
        "Manager {} reviewed {} with score {}",
        user.email,
        member.email,
        review.score
    );
    Ok(Json(ApiResponse::success(review)))
}

/// GET /api/manager/performance
pub async fn team_performance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<MemberPerformance>>>> {
    let members = team_of(&state, &user).await?;
    let ids: Vec<i64> = members.iter().map(|m| m.id).collect();
    let scores = load_scores(state.db.as_ref(), &ids, Utc::now()).await?;

    let rows = members
        .iter()
        .filter_map(|m| scores.get(&m.id).map(|s| member_performance(m, *s)))
        .collect();
    Ok(Json(ApiResponse::success(rows)))
}

/// GET /api/manager/performance/:id
pub async fn employee_performance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<MemberPerformance>>> {
    let member = team_member(&state, &user, id).await?;
    let scores = load_scores(state.db.as_ref(), &[member.id], Utc::now()).await?;
    let score = scores
        .get(&member.id)
        .copied()
        .unwrap_or_else(|| score::composite(None, None, None));
    Ok(Json(ApiResponse::success(member_performance(&member, score))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn scores_without_history_are_neutral() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<review::Model>::new()])
            .append_query_results([Vec::<task::Model>::new()])
            .append_query_results([Vec::<attendance::Model>::new()])
            .append_query_results([Vec::<attendance_log::Model>::new()])
            .into_connection();

        let scores = load_scores(&db, &[7], Utc::now()).await.unwrap();
        let s = scores[&7];
        assert_eq!(s.review, score::NEUTRAL);
        assert_eq!(s.deadline, score::NEUTRAL);
        assert_eq!(s.attendance, score::NEUTRAL);
        assert_eq!(s.composite, score::NEUTRAL);
    }

    #[tokio::test]
    async fn reviews_raise_the_composite() {
        let now = Utc::now();
        let reviews = vec![review::Model {
            id: 1,
            organization_id: 1,
            employee_id: 7,
            manager_id: 2,
            score: 5,
            comment: String::new(),
            created_at: now,
        }];
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([reviews])
            .append_query_results([Vec::<task::Model>::new()])
            .append_query_results([Vec::<attendance::Model>::new()])
            .append_query_results([Vec::<attendance_log::Model>::new()])
            .into_connection();

        let scores = load_scores(&db, &[7], now).await.unwrap();
        assert_eq!(scores[&7].review, 5.0);
        assert!(scores[&7].composite > score::NEUTRAL);
    }
}

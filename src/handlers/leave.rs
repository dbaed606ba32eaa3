//! Leave handlers
//!
//! Employees file and withdraw leave applications. HR-Admins decide them.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::entity::leave::{self, LeaveStatus};
use crate::error::{require, AppError, AppResult, OptionExt};
use crate::handlers::{default_page, default_page_size, page_bounds};
use crate::middleware::auth::CurrentUser;
use crate::permission::perm;
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListLeavesQuery {
    pub status: Option<LeaveStatus>,
    pub employee_id: Option<i64>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateLeaveRequest {
    pub title: String,
    pub reason: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub status: LeaveStatus,
}

#[derive(Debug, Serialize)]
pub struct LeaveList {
    pub leaves: Vec<leave::Model>,
    pub total: u64,
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if end < start {
        return Err(AppError::Validation(
            "end_date cannot be before start_date".to_string(),
        ));
    }
    Ok(())
}

/// Leave visible to the caller: any in the organization for HR, own otherwise.
async fn find_visible(state: &AppState, user: &CurrentUser, id: i64) -> AppResult<leave::Model> {
    let mut select = leave::Entity::find_by_id(id)
        .filter(leave::Column::OrganizationId.eq(user.organization_id));
    if user.is_hr() {
        user.require(perm::LEAVES_DECIDE)?;
    } else {
        user.require(perm::LEAVES_SELF)?;
        select = select.filter(leave::Column::EmployeeId.eq(user.id));
    }
    select
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Leave {} not found", id))
}

/// GET /api/leaves
pub async fn list_leaves(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListLeavesQuery>,
) -> AppResult<Json<ApiResponse<LeaveList>>> {
    let mut select = leave::Entity::find()
        .filter(leave::Column::OrganizationId.eq(user.organization_id));
    if user.is_hr() {
        user.require(perm::LEAVES_DECIDE)?;
        if let Some(employee_id) = query.employee_id {
            select = select.filter(leave::Column::EmployeeId.eq(employee_id));
        }
    } else {
        user.require(perm::LEAVES_SELF)?;
        select = select.filter(leave::Column::EmployeeId.eq(user.id));
    }
    if let Some(status) = query.status {
        select = select.filter(leave::Column::Status.eq(status));
    }

    let (page, page_size) = page_bounds(query.page, query.page_size);
    let paginator = select
        .order_by_desc(leave::Column::CreatedAt)
        .paginate(state.db.as_ref(), page_size);
    let total = paginator.num_items().await?;
    let leaves = paginator.fetch_page(page).await?;

    Ok(Json(ApiResponse::success(LeaveList { leaves, total })))
}

/// POST /api/leaves
pub async fn create_leave(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateLeaveRequest>,
) -> AppResult<Json<ApiResponse<leave::Model>>> {
    user.require(perm::LEAVES_SELF)?;
    require(&req.title, "title")?;
    require(&req.reason, "reason")?;
    validate_range(req.start_date, req.end_date)?;

    let now = Utc::now();
    let leave = leave::ActiveModel {
        organization_id: Set(user.organization_id),
        employee_id: Set(user.id),
        title: Set(req.title.trim().to_string()),
        reason: Set(req.reason.trim().to_string()),
        start_date: Set(req.start_date),
        end_date: Set(req.end_date),
        status: Set(LeaveStatus::Pending),
        approved_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(state.db.as_ref())
    .await?;

    tracing::info!(
        "Employee {} applied for leave {} ({} to {})",
        user.email,
        leave.id,
        leave.start_date,
        leave.end_date
    );
    Ok(Json(ApiResponse::success(leave)))
}

/// GET /api/leaves/:id
pub async fn get_leave(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<leave::Model>>> {
    let leave = find_visible(&state, &user, id).await?;
    Ok(Json(ApiResponse::success(leave)))
}

/// DELETE /api/leaves/:id
pub async fn delete_leave(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require(perm::LEAVES_SELF)?;
    let leave = leave::Entity::find_by_id(id)
        .filter(leave::Column::OrganizationId.eq(user.organization_id))
        .filter(leave::Column::EmployeeId.eq(user.id))
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Leave {} not found", id))?;
    if leave.status != LeaveStatus::Pending {
        return Err(AppError::BadRequest(
            "only pending leaves can be withdrawn".to_string(),
        ));
    }

    leave::Entity::delete_by_id(leave.id).exec(state.db.as_ref()).await?;

    tracing::info!("Employee {} withdrew leave {}", user.email, leave.id);
    Ok(Json(ApiResponse::success_msg("leave withdrawn")))
}

/// PATCH /api/leaves/:id/decision
pub async fn decide_leave(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<DecisionRequest>,
) -> AppResult<Json<ApiResponse<leave::Model>>> {
    user.require(perm::LEAVES_DECIDE)?;
    let leave = leave::Entity::find_by_id(id)
        .filter(leave::Column::OrganizationId.eq(user.organization_id))
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Leave {} not found", id))?;

    if !leave.status.can_transition_to(req.status) {
        return Err(AppError::BadRequest(format!(
            "leave is {:?} and cannot become {:?}",
            leave.status, req.status
        )));
    }

    // Only a row that is still Pending is written, so a concurrent decision
    // leaves this one with nothing to update.
    let now = Utc::now();
    let result = leave::Entity::update_many()
        .set(leave::ActiveModel {
            status: Set(req.status),
            approved_by: Set(Some(user.id)),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(leave::Column::Id.eq(leave.id))
        .filter(leave::Column::Status.eq(LeaveStatus::Pending))
        .exec(state.db.as_ref())
        .await?;
    if result.rows_affected != 1 {
        return Err(AppError::BadRequest(format!(
            "leave {} has already been decided",
            leave.id
        )));
    }

    let leave = leave::Model {
        status: req.status,
        approved_by: Some(user.id),
        updated_at: now,
        ..leave
    };

    tracing::info!("HR-Admin {} marked leave {} {:?}", user.email, leave.id, leave.status);
    Ok(Json(ApiResponse::success(leave)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_day_leave_is_valid() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert!(validate_range(day, day).is_ok());
        assert!(validate_range(day, day.succ_opt().unwrap()).is_ok());
        assert!(validate_range(day.succ_opt().unwrap(), day).is_err());
    }

    #[test]
    fn decision_body_accepts_status_names() {
        let req: DecisionRequest = serde_json::from_str(r#"{"status":"Rejected"}"#).unwrap();
        assert_eq!(req.status, LeaveStatus::Rejected);
        assert!(serde_json::from_str::<DecisionRequest>(r#"{"status":"Denied"}"#).is_err());
    }
}

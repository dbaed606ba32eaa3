//! Dashboard handlers

use axum::{extract::State, response::Json, Extension};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;

use crate::entity::employee::EmployeeStatus;
use crate::entity::generate_request::{self, RequestStatus};
use crate::entity::leave::{self, LeaveStatus};
use crate::entity::task::{self, TaskStatus};
use crate::entity::{attendance, attendance_log, department, employee, notice};
use crate::error::AppResult;
use crate::handlers::manager::load_scores;
use crate::middleware::auth::CurrentUser;
use crate::permission::perm;
use crate::routes::ApiResponse;
use crate::score::{self, PerformanceScore};
use crate::state::AppState;

const LATEST_NOTICES: u64 = 5;

#[derive(Debug, Serialize)]
pub struct OrgDashboard {
    pub employees_active: u64,
    pub employees_inactive: u64,
    pub departments: u64,
    pub pending_leaves: u64,
    pub pending_requests: u64,
    pub active_today: usize,
    pub latest_notices: Vec<notice::Model>,
}

#[derive(Debug, Serialize)]
pub struct MyDashboard {
    pub present_ratio: Option<f64>,
    pub active_today: bool,
    pub pending_leaves: u64,
    pub pending_requests: u64,
    pub open_tasks: u64,
    pub performance: PerformanceScore,
}

async fn count_employees(state: &AppState, org: i64, status: EmployeeStatus) -> AppResult<u64> {
    Ok(employee::Entity::find()
        .filter(employee::Column::OrganizationId.eq(org))
        .filter(employee::Column::Status.eq(status))
        .count(state.db.as_ref())
        .await?)
}

/// GET /api/dashboard
pub async fn org_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<OrgDashboard>>> {
    user.require(perm::DASHBOARD_ORG)?;
    let org = user.organization_id;
    let now = Utc::now();

    let employees_active = count_employees(&state, org, EmployeeStatus::Active).await?;
    let employees_inactive = count_employees(&state, org, EmployeeStatus::Inactive).await?;
    let departments = department::Entity::find()
        .filter(department::Column::OrganizationId.eq(org))
        .count(state.db.as_ref())
        .await?;
    let pending_leaves = leave::Entity::find()
        .filter(leave::Column::OrganizationId.eq(org))
        .filter(leave::Column::Status.eq(LeaveStatus::Pending))
        .count(state.db.as_ref())
        .await?;
    let pending_requests = generate_request::Entity::find()
        .filter(generate_request::Column::OrganizationId.eq(org))
        .filter(generate_request::Column::Status.eq(RequestStatus::Pending))
        .count(state.db.as_ref())
        .await?;

    let sheet_ids: Vec<i64> = attendance::Entity::find()
        .filter(attendance::Column::OrganizationId.eq(org))
        .all(state.db.as_ref())
        .await?
        .into_iter()
        .map(|a| a.id)
        .collect();
    let active_today = attendance_log::Entity::find()
        .filter(attendance_log::Column::AttendanceId.is_in(sheet_ids))
        .filter(attendance_log::Column::LogDate.eq(now.date_naive()))
        .all(state.db.as_ref())
        .await?
        .iter()
        .filter(|l| l.is_active_at(now))
        .count();

    let latest_notices = notice::Entity::find()
        .filter(notice::Column::OrganizationId.eq(org))
        .order_by_desc(notice::Column::CreatedAt)
        .limit(LATEST_NOTICES)
        .all(state.db.as_ref())
        .await?;

    Ok(Json(ApiResponse::success(OrgDashboard {
        employees_active,
        employees_inactive,
        departments,
        pending_leaves,
        pending_requests,
        active_today,
        latest_notices,
    })))
}

/// GET /api/dashboard/me
pub async fn my_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<MyDashboard>>> {
    user.require(perm::DASHBOARD_SELF)?;
    let now = Utc::now();

    let logs = match attendance::Entity::find()
        .filter(attendance::Column::EmployeeId.eq(user.id))
        .one(state.db.as_ref())
        .await?
    {
        Some(sheet) => {
            attendance_log::Entity::find()
                .filter(attendance_log::Column::AttendanceId.eq(sheet.id))
                .all(state.db.as_ref())
                .await?
        }
        None => Vec::new(),
    };

    let pending_leaves = leave::Entity::find()
        .filter(leave::Column::EmployeeId.eq(user.id))
        .filter(leave::Column::Status.eq(LeaveStatus::Pending))
        .count(state.db.as_ref())
        .await?;
    let pending_requests = generate_request::Entity::find()
        .filter(generate_request::Column::EmployeeId.eq(user.id))
        .filter(generate_request::Column::Status.eq(RequestStatus::Pending))
        .count(state.db.as_ref())
        .await?;
    let open_tasks = task::Entity::find()
        .filter(task::Column::AssignedTo.eq(user.id))
        .filter(task::Column::Status.ne(TaskStatus::Completed))
        .count(state.db.as_ref())
        .await?;

    let performance = load_scores(state.db.as_ref(), &[user.id], now)
        .await?
        .remove(&user.id)
        .unwrap_or_else(|| score::composite(None, None, None));

    Ok(Json(ApiResponse::success(MyDashboard {
        present_ratio: attendance_log::present_ratio(&logs),
        active_today: attendance_log::is_active_today(&logs, now),
        pending_leaves,
        pending_requests,
        open_tasks,
        performance,
    })))
}

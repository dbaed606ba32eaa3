//! Attendance handlers
//!
//! HR initializes one attendance sheet per employee and may set any day's
//! status. Employees check in and out against today's UTC entry.

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entity::attendance_log::{self, AttendanceStatus};
use crate::entity::{attendance, employee};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::find_employee;
use crate::middleware::auth::CurrentUser;
use crate::permission::perm;
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    pub employee_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAttendanceRequest {
    pub employee_id: i64,
    /// Defaults to today (UTC)
    pub date: Option<NaiveDate>,
    pub status: AttendanceStatus,
}

/// One row of the HR overview
#[derive(Debug, Serialize)]
pub struct AttendanceRow {
    pub id: i64,
    pub employee_id: i64,
    pub employee_name: String,
    pub today: Option<attendance_log::Model>,
    pub active_today: bool,
}

/// Full attendance sheet of one employee
#[derive(Debug, Serialize)]
pub struct AttendanceSheet {
    #[serde(flatten)]
    pub attendance: attendance::Model,
    pub logs: Vec<attendance_log::Model>,
    pub present_ratio: Option<f64>,
    pub active_today: bool,
}

async fn sheet_for_employee(
    state: &AppState,
    organization_id: i64,
    employee_id: i64,
) -> AppResult<Option<attendance::Model>> {
    Ok(attendance::Entity::find()
        .filter(attendance::Column::OrganizationId.eq(organization_id))
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .one(state.db.as_ref())
        .await?)
}

async fn logs_of(state: &AppState, attendance_id: i64) -> AppResult<Vec<attendance_log::Model>> {
    Ok(attendance_log::Entity::find()
        .filter(attendance_log::Column::AttendanceId.eq(attendance_id))
        .order_by_desc(attendance_log::Column::LogDate)
        .all(state.db.as_ref())
        .await?)
}

async fn build_sheet(state: &AppState, attendance: attendance::Model) -> AppResult<AttendanceSheet> {
    let logs = logs_of(state, attendance.id).await?;
    let now = Utc::now();
    Ok(AttendanceSheet {
        present_ratio: attendance_log::present_ratio(&logs),
        active_today: attendance_log::is_active_today(&logs, now),
        attendance,
        logs,
    })
}

/// GET /api/attendance
pub async fn list_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<AttendanceRow>>>> {
    user.require(perm::ATTENDANCE_MANAGE)?;
    let now = Utc::now();

    let sheets = attendance::Entity::find()
        .filter(attendance::Column::OrganizationId.eq(user.organization_id))
        .order_by_asc(attendance::Column::Id)
        .all(state.db.as_ref())
        .await?;
    let names: HashMap<i64, String> = employee::Entity::find()
        .filter(employee::Column::OrganizationId.eq(user.organization_id))
        .all(state.db.as_ref())
        .await?
        .into_iter()
        .map(|e| (e.id, e.full_name()))
        .collect();

    let ids: Vec<i64> = sheets.iter().map(|s| s.id).collect();
    let mut today: HashMap<i64, attendance_log::Model> = attendance_log::Entity::find()
        .filter(attendance_log::Column::AttendanceId.is_in(ids))
        .filter(attendance_log::Column::LogDate.eq(now.date_naive()))
        .all(state.db.as_ref())
        .await?
        .into_iter()
        .map(|l| (l.attendance_id, l))
        .collect();

    let rows = sheets
        .into_iter()
        .map(|s| {
            let log = today.remove(&s.id);
            AttendanceRow {
                id: s.id,
                employee_id: s.employee_id,
                employee_name: names.get(&s.employee_id).cloned().unwrap_or_default(),
                active_today: log.as_ref().map(|l| l.is_active_at(now)).unwrap_or(false),
                today: log,
            }
        })
        .collect();

    Ok(Json(ApiResponse::success(rows)))
}

/// POST /api/attendance/initialize
pub async fn initialize(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<InitializeRequest>,
) -> AppResult<Json<ApiResponse<attendance::Model>>> {
    user.require(perm::ATTENDANCE_MANAGE)?;
    let emp = find_employee(state.db.as_ref(), user.organization_id, req.employee_id).await?;
    if sheet_for_employee(&state, user.organization_id, emp.id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "attendance already initialized for employee {}",
            emp.id
        )));
    }

    let now = Utc::now();
    let sheet = attendance::ActiveModel {
        organization_id: Set(user.organization_id),
        employee_id: Set(emp.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(state.db.as_ref())
    .await?;

    tracing::info!("HR-Admin {} initialized attendance for {}", user.email, emp.email);
    Ok(Json(ApiResponse::success(sheet)))
}

/// GET /api/attendance/:id
pub async fn get_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<AttendanceSheet>>> {
    user.require(perm::ATTENDANCE_MANAGE)?;
    let sheet = attendance::Entity::find_by_id(id)
        .filter(attendance::Column::OrganizationId.eq(user.organization_id))
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Attendance {} not found", id))?;
    Ok(Json(ApiResponse::success(build_sheet(&state, sheet).await?)))
}

/// PATCH /api/attendance/update
pub async fn update_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateAttendanceRequest>,
) -> AppResult<Json<ApiResponse<attendance_log::Model>>> {
    user.require(perm::ATTENDANCE_MANAGE)?;
    let sheet = sheet_for_employee(&state, user.organization_id, req.employee_id)
        .await?
        .ok_or_not_found(format!(
            "attendance not initialized for employee {}",
            req.employee_id
        ))?;
    let day = req.date.unwrap_or_else(|| Utc::now().date_naive());

    let existing = attendance_log::Entity::find()
        .filter(attendance_log::Column::AttendanceId.eq(sheet.id))
        .filter(attendance_log::Column::LogDate.eq(day))
        .one(state.db.as_ref())
        .await?;
    let log = match existing {
        Some(log) => {
            let mut active = log.into_active_model();
            active.status = Set(req.status);
            active.update(state.db.as_ref()).await?
        }
        None => {
            attendance_log::ActiveModel {
                attendance_id: Set(sheet.id),
                log_date: Set(day),
                status: Set(req.status),
                check_in: Set(None),
                check_out: Set(None),
                ..Default::default()
            }
            .insert(state.db.as_ref())
            .await?
        }
    };
    touch(&state, sheet).await?;

    tracing::info!(
        "HR-Admin {} set attendance of employee {} on {} to {:?}",
        user.email,
        req.employee_id,
        day,
        req.status
    );
    Ok(Json(ApiResponse::success(log)))
}

/// DELETE /api/attendance/:id
pub async fn delete_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require(perm::ATTENDANCE_MANAGE)?;
    let sheet = attendance::Entity::find_by_id(id)
        .filter(attendance::Column::OrganizationId.eq(user.organization_id))
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Attendance {} not found", id))?;

    attendance_log::Entity::delete_many()
        .filter(attendance_log::Column::AttendanceId.eq(sheet.id))
        .exec(state.db.as_ref())
        .await?;
    attendance::Entity::delete_by_id(sheet.id).exec(state.db.as_ref()).await?;

    tracing::info!("HR-Admin {} deleted attendance {}", user.email, sheet.id);
    Ok(Json(ApiResponse::success_msg("attendance deleted")))
}

async fn my_sheet(state: &AppState, user: &CurrentUser) -> AppResult<attendance::Model> {
    user.require(perm::ATTENDANCE_SELF)?;
    sheet_for_employee(state, user.organization_id, user.id)
        .await?
        .ok_or_not_found("attendance has not been initialized for you yet")
}

async fn touch(state: &AppState, sheet: attendance::Model) -> AppResult<()> {
    let mut active = sheet.into_active_model();
    active.updated_at = Set(Utc::now());
    active.update(state.db.as_ref()).await?;
    Ok(())
}

/// GET /api/attendance/me
pub async fn my_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<AttendanceSheet>>> {
    let sheet = my_sheet(&state, &user).await?;
    Ok(Json(ApiResponse::success(build_sheet(&state, sheet).await?)))
}

/// POST /api/attendance/me/check-in
pub async fn check_in(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<attendance_log::Model>>> {
    let sheet = my_sheet(&state, &user).await?;
    let now = Utc::now();
    let today = now.date_naive();

    let existing = attendance_log::Entity::find()
        .filter(attendance_log::Column::AttendanceId.eq(sheet.id))
        .filter(attendance_log::Column::LogDate.eq(today))
        .one(state.db.as_ref())
        .await?;
    let log = match existing {
        Some(log) if log.is_open() => {
            return Err(AppError::Conflict("already checked in".to_string()));
        }
        Some(log) if log.check_out.is_some() => {
            return Err(AppError::Conflict("already checked out for today".to_string()));
        }
        Some(log) => {
            let mut active = log.into_active_model();
            active.status = Set(AttendanceStatus::Present);
            active.check_in = Set(Some(now));
            active.update(state.db.as_ref()).await?
        }
        None => {
            attendance_log::ActiveModel {
                attendance_id: Set(sheet.id),
                log_date: Set(today),
                status: Set(AttendanceStatus::Present),
                check_in: Set(Some(now)),
                check_out: Set(None),
                ..Default::default()
            }
            .insert(state.db.as_ref())
            .await?
        }
    };
    touch(&state, sheet).await?;

    tracing::info!("Employee {} checked in", user.email);
    Ok(Json(ApiResponse::success(log)))
}

/// POST /api/attendance/me/check-out
pub async fn check_out(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<attendance_log::Model>>> {
    let sheet = my_sheet(&state, &user).await?;

    // Latest open entry, so a shift crossing midnight can still close.
    let open = attendance_log::Entity::find()
        .filter(attendance_log::Column::AttendanceId.eq(sheet.id))
        .filter(attendance_log::Column::CheckIn.is_not_null())
        .filter(attendance_log::Column::CheckOut.is_null())
        .order_by_desc(attendance_log::Column::LogDate)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::BadRequest("no open check-in to close".to_string()))?;

    let mut active = open.into_active_model();
    active.check_out = Set(Some(Utc::now()));
    let log = active.update(state.db.as_ref()).await?;
    touch(&state, sheet).await?;

    tracing::info!("Employee {} checked out", user.email);
    Ok(Json(ApiResponse::success(log)))
}

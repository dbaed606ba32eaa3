//! Department handlers
//!
//! Implements department CRUD, membership and manager assignment

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entity::employee::EmployeeStatus;
use crate::entity::{department, employee};
use crate::error::{require, AppError, AppResult};
use crate::handlers::{find_department, find_employee};
use crate::middleware::auth::CurrentUser;
use crate::permission::perm;
use crate::routes::ApiResponse;
use crate::state::AppState;

const MAX_NAME_CHARS: usize = 64;

#[derive(Debug, Deserialize)]
pub struct CreateDepartmentRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDepartmentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmployeeIdRequest {
    pub employee_id: i64,
}

/// Department with its active member count
#[derive(Debug, Serialize)]
pub struct DepartmentSummary {
    #[serde(flatten)]
    pub department: department::Model,
    pub member_count: usize,
}

/// Department with its members
#[derive(Debug, Serialize)]
pub struct DepartmentDetail {
    #[serde(flatten)]
    pub department: department::Model,
    pub members: Vec<employee::Model>,
}

fn validate_name(name: &str) -> AppResult<String> {
    require(name, "name")?;
    let name = name.trim();
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::Validation(format!(
            "department name cannot exceed {} characters",
            MAX_NAME_CHARS
        )));
    }
    Ok(name.to_string())
}

async fn ensure_name_free(
    state: &AppState,
    organization_id: i64,
    name: &str,
    except_id: Option<i64>,
) -> AppResult<()> {
    let mut select = department::Entity::find()
        .filter(department::Column::OrganizationId.eq(organization_id))
        .filter(department::Column::Name.eq(name));
    if let Some(id) = except_id {
        select = select.filter(department::Column::Id.ne(id));
    }
    if select.count(state.db.as_ref()).await? > 0 {
        return Err(AppError::Conflict(format!("department '{}' already exists", name)));
    }
    Ok(())
}

/// GET /api/departments
pub async fn list_departments(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<DepartmentSummary>>>> {
    user.require(perm::DEPARTMENTS_MANAGE)?;

    let departments = department::Entity::find()
        .filter(department::Column::OrganizationId.eq(user.organization_id))
        .order_by_asc(department::Column::Name)
        .all(state.db.as_ref())
        .await?;

    let members = employee::Entity::find()
        .filter(employee::Column::OrganizationId.eq(user.organization_id))
        .filter(employee::Column::Status.eq(EmployeeStatus::Active))
        .filter(employee::Column::DepartmentId.is_not_null())
        .all(state.db.as_ref())
        .await?;
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for emp in &members {
        if let Some(dept_id) = emp.department_id {
            *counts.entry(dept_id).or_default() += 1;
        }
    }

    let summaries = departments
        .into_iter()
        .map(|d| DepartmentSummary {
            member_count: counts.get(&d.id).copied().unwrap_or(0),
            department: d,
        })
        .collect();

    Ok(Json(ApiResponse::success(summaries)))
}

/// POST /api/departments
pub async fn create_department(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateDepartmentRequest>,
) -> AppResult<Json<ApiResponse<department::Model>>> {
    user.require(perm::DEPARTMENTS_MANAGE)?;
    let name = validate_name(&req.name)?;
    ensure_name_free(&state, user.organization_id, &name, None).await?;

    let now = Utc::now();
    let dept = department::ActiveModel {
        organization_id: Set(user.organization_id),
        name: Set(name),
        description: Set(req.description),
        manager_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(state.db.as_ref())
    .await?;

    tracing::info!("HR-Admin {} created department {}", user.email, dept.name);
    Ok(Json(ApiResponse::success(dept)))
}

/// GET /api/departments/:id
pub async fn get_department(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<DepartmentDetail>>> {
    user.require(perm::DEPARTMENTS_MANAGE)?;
    let dept = find_department(state.db.as_ref(), user.organization_id, id).await?;

    let members = employee::Entity::find()
        .filter(employee::Column::DepartmentId.eq(dept.id))
        .filter(employee::Column::Status.eq(EmployeeStatus::Active))
        .order_by_asc(employee::Column::LastName)
        .all(state.db.as_ref())
        .await?;

    Ok(Json(ApiResponse::success(DepartmentDetail {
        department: dept,
        members,
    })))
}

/// PATCH /api/departments/:id
pub async fn update_department(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateDepartmentRequest>,
) -> AppResult<Json<ApiResponse<department::Model>>> {
    user.require(perm::DEPARTMENTS_MANAGE)?;
    let dept = find_department(state.db.as_ref(), user.organization_id, id).await?;

    let mut active = dept.into_active_model();
    if let Some(name) = req.name {
        let name = validate_name(&name)?;
        ensure_name_free(&state, user.organization_id, &name, Some(id)).await?;
        active.name = Set(name);
    }
    if let Some(description) = req.description {
        active.description = Set(description);
    }
    active.updated_at = Set(Utc::now());
    let dept = active.update(state.db.as_ref()).await?;

    tracing::info!("HR-Admin {} updated department {}", user.email, dept.name);
    Ok(Json(ApiResponse::success(dept)))
}

/// DELETE /api/departments/:id
pub async fn delete_department(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require(perm::DEPARTMENTS_MANAGE)?;
    let dept = find_department(state.db.as_ref(), user.organization_id, id).await?;

    let assigned = employee::Entity::find()
        .filter(employee::Column::DepartmentId.eq(dept.id))
        .filter(employee::Column::Status.eq(EmployeeStatus::Active))
        .count(state.db.as_ref())
        .await?;
    if assigned > 0 {
        return Err(AppError::Conflict(format!(
            "department still has {} employee(s)",
            assigned
        )));
    }

    // Inactive members keep no dangling reference
    employee::Entity::update_many()
        .col_expr(employee::Column::DepartmentId, sea_orm::sea_query::Expr::value(Option::<i64>::None))
        .filter(employee::Column::DepartmentId.eq(dept.id))
        .exec(state.db.as_ref())
        .await?;
    department::Entity::delete_by_id(dept.id).exec(state.db.as_ref()).await?;

    tracing::info!("HR-Admin {} deleted department {}", user.email, dept.name);
    Ok(Json(ApiResponse::success_msg("department deleted")))
}

/// POST /api/departments/:id/employees
pub async fn assign_employee(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<EmployeeIdRequest>,
) -> AppResult<Json<ApiResponse<employee::Model>>> {
    user.require(perm::DEPARTMENTS_MANAGE)?;
    let dept = find_department(state.db.as_ref(), user.organization_id, id).await?;
    let emp = find_employee(state.db.as_ref(), user.organization_id, req.employee_id).await?;

    if !emp.is_active() {
        return Err(AppError::BadRequest("employee is inactive".to_string()));
    }
    if emp.department_id == Some(dept.id) {
        return Err(AppError::Conflict("employee is already in this department".to_string()));
    }
    let previous = emp.department_id;

    let mut active = emp.into_active_model();
    active.department_id = Set(Some(dept.id));
    active.updated_at = Set(Utc::now());
    let emp = active.update(state.db.as_ref()).await?;

    if let Some(prev_id) = previous {
        clear_manager_if(&state, prev_id, emp.id).await?;
    }

    tracing::info!("HR-Admin {} moved {} into {}", user.email, emp.email, dept.name);
    Ok(Json(ApiResponse::success(emp)))
}

/// DELETE /api/departments/:id/employees/:employee_id
pub async fn remove_employee(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, employee_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<employee::Model>>> {
    user.require(perm::DEPARTMENTS_MANAGE)?;
    let dept = find_department(state.db.as_ref(), user.organization_id, id).await?;
    let emp = find_employee(state.db.as_ref(), user.organization_id, employee_id).await?;

    if emp.department_id != Some(dept.id) {
        return Err(AppError::NotFound("employee is not in this department".to_string()));
    }

    let mut active = emp.into_active_model();
    active.department_id = Set(None);
    active.updated_at = Set(Utc::now());
    let emp = active.update(state.db.as_ref()).await?;
    clear_manager_if(&state, dept.id, emp.id).await?;

    tracing::info!("HR-Admin {} removed {} from {}", user.email, emp.email, dept.name);
    Ok(Json(ApiResponse::success(emp)))
}

/// POST /api/departments/:id/manager
pub async fn set_manager(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<EmployeeIdRequest>,
) -> AppResult<Json<ApiResponse<department::Model>>> {
    user.require(perm::DEPARTMENTS_MANAGE)?;
    let dept = find_department(state.db.as_ref(), user.organization_id, id).await?;
    let emp = find_employee(state.db.as_ref(), user.organization_id, req.employee_id).await?;

    if !emp.is_active() || !emp.is_manager() {
        return Err(AppError::BadRequest(
            "department manager must be an active employee with the Manager role".to_string(),
        ));
    }
    if emp.department_id != Some(dept.id) {
        return Err(AppError::BadRequest(
            "manager must belong to the department".to_string(),
        ));
    }

    let mut active = dept.into_active_model();
    active.manager_id = Set(Some(emp.id));
    active.updated_at = Set(Utc::now());
    let dept = active.update(state.db.as_ref()).await?;

    tracing::info!("HR-Admin {} made {} manager of {}", user.email, emp.email, dept.name);
    Ok(Json(ApiResponse::success(dept)))
}

async fn clear_manager_if(state: &AppState, department_id: i64, employee_id: i64) -> AppResult<()> {
    let dept = department::Entity::find_by_id(department_id)
        .one(state.db.as_ref())
        .await?;
    if let Some(dept) = dept.filter(|d| d.manager_id == Some(employee_id)) {
        let mut active = dept.into_active_model();
        active.manager_id = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(state.db.as_ref()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn department_names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("  Finance ").unwrap(), "Finance");
        assert!(validate_name("").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_CHARS + 1)).is_err());
        assert!(validate_name(&"é".repeat(MAX_NAME_CHARS)).is_ok());
    }
}

//! Employee handlers
//!
//! HR-side employee management plus the employee's own profile. Removal is
//! a soft delete: the status flips to `Inactive`.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::auth::{check_password_strength, hash_password, normalize_email};
use crate::entity::employee::{EmployeeRole, EmployeeStatus};
use crate::entity::{department, employee, organization};
use crate::error::{require, AppError, AppResult};
use crate::handlers::{
    default_page, default_page_size, ensure_email_free, find_department, find_employee, page_bounds,
};
use crate::mail::templates;
use crate::middleware::auth::CurrentUser;
use crate::permission::perm;
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListEmployeesQuery {
    pub status: Option<EmployeeStatus>,
    pub department_id: Option<i64>,
    pub role: Option<EmployeeRole>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Generated when omitted; mailed to the employee either way
    pub password: Option<String>,
    pub contact_number: String,
    pub role: Option<EmployeeRole>,
    pub department_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub role: Option<EmployeeRole>,
    pub department_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub contact_number: String,
}

#[derive(Debug, Serialize)]
pub struct EmployeeList {
    pub employees: Vec<employee::Model>,
    pub total: u64,
}

/// Employee with its department resolved
#[derive(Debug, Serialize)]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub employee: employee::Model,
    pub department: Option<department::Model>,
}

async fn with_department(state: &AppState, emp: employee::Model) -> AppResult<EmployeeDetail> {
    let department = match emp.department_id {
        Some(id) => department::Entity::find_by_id(id).one(state.db.as_ref()).await?,
        None => None,
    };
    Ok(EmployeeDetail {
        employee: emp,
        department,
    })
}

fn temporary_password() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    raw[..12].to_string()
}

/// GET /api/employees
pub async fn list_employees(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListEmployeesQuery>,
) -> AppResult<Json<ApiResponse<EmployeeList>>> {
    user.require(perm::EMPLOYEES_MANAGE)?;

    let mut select = employee::Entity::find()
        .filter(employee::Column::OrganizationId.eq(user.organization_id));
    if let Some(status) = query.status {
        select = select.filter(employee::Column::Status.eq(status));
    }
    if let Some(dept_id) = query.department_id {
        select = select.filter(employee::Column::DepartmentId.eq(dept_id));
    }
    if let Some(role) = query.role {
        select = select.filter(employee::Column::Role.eq(role));
    }

    let (page, page_size) = page_bounds(query.page, query.page_size);
    let paginator = select
        .order_by_asc(employee::Column::Id)
        .paginate(state.db.as_ref(), page_size);
    let total = paginator.num_items().await?;
    let employees = paginator.fetch_page(page).await?;

    Ok(Json(ApiResponse::success(EmployeeList { employees, total })))
}

/// POST /api/employees
pub async fn create_employee(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateEmployeeRequest>,
) -> AppResult<Json<ApiResponse<employee::Model>>> {
    user.require(perm::EMPLOYEES_MANAGE)?;
    require(&req.first_name, "first_name")?;
    require(&req.last_name, "last_name")?;
    require(&req.contact_number, "contact_number")?;
    let email = normalize_email(&req.email)?;

    let password = match req.password {
        Some(p) => {
            check_password_strength(&p)?;
            p
        }
        None => temporary_password(),
    };

    ensure_email_free(state.db.as_ref(), &email).await?;
    if let Some(dept_id) = req.department_id {
        find_department(state.db.as_ref(), user.organization_id, dept_id).await?;
    }

    let now = Utc::now();
    let emp = employee::ActiveModel {
        organization_id: Set(user.organization_id),
        first_name: Set(req.first_name.trim().to_string()),
        last_name: Set(req.last_name.trim().to_string()),
        email: Set(email),
        password: Set(hash_password(&password)?),
        contact_number: Set(req.contact_number.trim().to_string()),
        role: Set(req.role.unwrap_or(EmployeeRole::Employee)),
        status: Set(EmployeeStatus::Active),
        department_id: Set(req.department_id),
        is_verified: Set(false),
        reset_token_hash: Set(None),
        reset_expires_at: Set(None),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(state.db.as_ref())
    .await?;

    let org_name = organization::Entity::find_by_id(user.organization_id)
        .one(state.db.as_ref())
        .await?
        .map(|o| o.name)
        .unwrap_or_default();
    state.send_mail(templates::employee_welcome(
        &emp.email,
        &emp.first_name,
        &org_name,
        &state.config.client_url,
        &password,
    ));

    tracing::info!("HR-Admin {} created employee {}", user.email, emp.email);
    Ok(Json(ApiResponse::success(emp)))
}

/// GET /api/employees/:id
pub async fn get_employee(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<EmployeeDetail>>> {
    user.require(perm::EMPLOYEES_MANAGE)?;
    let emp = find_employee(state.db.as_ref(), user.organization_id, id).await?;
    Ok(Json(ApiResponse::success(with_department(&state, emp).await?)))
}

/// PATCH /api/employees/:id
pub async fn update_employee(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateEmployeeRequest>,
) -> AppResult<Json<ApiResponse<employee::Model>>> {
    user.require(perm::EMPLOYEES_MANAGE)?;
    let emp = find_employee(state.db.as_ref(), user.organization_id, id).await?;
    let demoted = req.role == Some(EmployeeRole::Employee) && emp.is_manager();
    let previous_department = emp.department_id;

    let mut active = emp.clone().into_active_model();
    if let Some(first_name) = req.first_name {
        require(&first_name, "first_name")?;
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = req.last_name {
        require(&last_name, "last_name")?;
        active.last_name = Set(last_name.trim().to_string());
    }
    if let Some(email) = req.email {
        let email = normalize_email(&email)?;
        if email != emp.email {
            ensure_email_free(state.db.as_ref(), &email).await?;
            active.email = Set(email);
        }
    }
    if let Some(contact_number) = req.contact_number {
        active.contact_number = Set(contact_number.trim().to_string());
    }
    if let Some(role) = req.role {
        active.role = Set(role);
    }
    if let Some(dept_id) = req.department_id {
        find_department(state.db.as_ref(), user.organization_id, dept_id).await?;
        active.department_id = Set(Some(dept_id));
    }
    active.updated_at = Set(Utc::now());
    let emp = active.update(state.db.as_ref()).await?;

    let moved = emp.department_id != previous_department;
    if demoted || moved {
        release_management(&state, emp.id).await?;
    }

    tracing::info!("HR-Admin {} updated employee {}", user.email, emp.email);
    Ok(Json(ApiResponse::success(emp)))
}

/// Clear `manager_id` on any department headed by this employee.
async fn release_management(state: &AppState, employee_id: i64) -> AppResult<()> {
    let headed = department::Entity::find()
        .filter(department::Column::ManagerId.eq(employee_id))
        .all(state.db.as_ref())
        .await?;
    for dept in headed {
        let mut active = dept.into_active_model();
        active.manager_id = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(state.db.as_ref()).await?;
    }
    Ok(())
}

async fn set_status(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
    status: EmployeeStatus,
) -> AppResult<employee::Model> {
    user.require(perm::EMPLOYEES_MANAGE)?;
    let emp = find_employee(state.db.as_ref(), user.organization_id, id).await?;
    if emp.status == status {
        return Err(AppError::BadRequest(format!(
            "employee is already {:?}",
            status
        )));
    }

    let mut active = emp.into_active_model();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());
    Ok(active.update(state.db.as_ref()).await?)
}

/// DELETE /api/employees/:id
pub async fn deactivate_employee(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<employee::Model>>> {
    let emp = set_status(&state, &user, id, EmployeeStatus::Inactive).await?;
    release_management(&state, emp.id).await?;

    tracing::info!("HR-Admin {} deactivated employee {}", user.email, emp.email);
    Ok(Json(ApiResponse::with_message("employee deactivated", emp)))
}

/// POST /api/employees/:id/reactivate
pub async fn reactivate_employee(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<employee::Model>>> {
    let emp = set_status(&state, &user, id, EmployeeStatus::Active).await?;

    tracing::info!("HR-Admin {} reactivated employee {}", user.email, emp.email);
    Ok(Json(ApiResponse::with_message("employee reactivated", emp)))
}

/// GET /api/employees/me
pub async fn get_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<EmployeeDetail>>> {
    user.require(perm::PROFILE_SELF)?;
    let emp = find_employee(state.db.as_ref(), user.organization_id, user.id).await?;
    Ok(Json(ApiResponse::success(with_department(&state, emp).await?)))
}

/// PATCH /api/employees/me
pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateMeRequest>,
) -> AppResult<Json<ApiResponse<employee::Model>>> {
    user.require(perm::PROFILE_SELF)?;
    require(&req.contact_number, "contact_number")?;
    let emp = find_employee(state.db.as_ref(), user.organization_id, user.id).await?;

    let mut active = emp.into_active_model();
    active.contact_number = Set(req.contact_number.trim().to_string());
    active.updated_at = Set(Utc::now());
    let emp = active.update(state.db.as_ref()).await?;

    Ok(Json(ApiResponse::success(emp)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_passwords_meet_the_minimum() {
        let p = temporary_password();
        assert!(check_password_strength(&p).is_ok());
        assert_ne!(p, temporary_password());
    }
}

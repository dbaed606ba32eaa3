//! Salary handlers

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::entity::salary::{self, SalaryStatus};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::{default_page, default_page_size, find_employee, page_bounds};
use crate::middleware::auth::CurrentUser;
use crate::permission::perm;
use crate::routes::ApiResponse;
use crate::state::AppState;

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ListSalariesQuery {
    pub employee_id: Option<i64>,
    pub status: Option<SalaryStatus>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateSalaryRequest {
    pub employee_id: i64,
    pub basic_pay: i64,
    #[serde(default)]
    pub bonuses: i64,
    #[serde(default)]
    pub deductions: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub status: Option<SalaryStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSalaryRequest {
    pub basic_pay: Option<i64>,
    pub bonuses: Option<i64>,
    pub deductions: Option<i64>,
    pub currency: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub status: Option<SalaryStatus>,
}

#[derive(Debug, Serialize)]
pub struct SalaryList {
    pub salaries: Vec<salary::Model>,
    pub total: u64,
}

fn validate_amounts(basic_pay: i64, bonuses: i64, deductions: i64) -> AppResult<i64> {
    if basic_pay < 0 || bonuses < 0 || deductions < 0 {
        return Err(AppError::Validation(
            "salary amounts cannot be negative".to_string(),
        ));
    }
    salary::net_pay(basic_pay, bonuses, deductions)
        .ok_or_else(|| AppError::Validation("salary amounts are out of range".to_string()))
}

fn normalize_currency(code: &str) -> AppResult<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation(format!(
            "'{}' is not a three-letter currency code",
            code
        )));
    }
    Ok(code)
}

/// Paid salaries carry a payment date; default it to today.
fn payment_date_for(status: SalaryStatus, given: Option<NaiveDate>) -> Option<NaiveDate> {
    match (status, given) {
        (_, Some(date)) => Some(date),
        (SalaryStatus::Paid, None) => Some(Utc::now().date_naive()),
        _ => None,
    }
}

async fn ensure_period_free(
    state: &AppState,
    employee_id: i64,
    due_date: NaiveDate,
    except_id: Option<i64>,
) -> AppResult<()> {
    let mut select = salary::Entity::find()
        .filter(salary::Column::EmployeeId.eq(employee_id))
        .filter(salary::Column::DueDate.eq(due_date));
    if let Some(id) = except_id {
        select = select.filter(salary::Column::Id.ne(id));
    }
    if select.count(state.db.as_ref()).await? > 0 {
        return Err(AppError::Conflict(format!(
            "employee {} already has a salary due {}",
            employee_id, due_date
        )));
    }
    Ok(())
}

async fn find_salary(state: &AppState, organization_id: i64, id: i64) -> AppResult<salary::Model> {
    salary::Entity::find_by_id(id)
        .filter(salary::Column::OrganizationId.eq(organization_id))
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Salary {} not found", id))
}

/// GET /api/salaries
pub async fn list_salaries(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListSalariesQuery>,
) -> AppResult<Json<ApiResponse<SalaryList>>> {
    user.require(perm::SALARIES_MANAGE)?;

    let mut select = salary::Entity::find()
        .filter(salary::Column::OrganizationId.eq(user.organization_id));
    if let Some(employee_id) = query.employee_id {
        select = select.filter(salary::Column::EmployeeId.eq(employee_id));
    }
    if let Some(status) = query.status {
        select = select.filter(salary::Column::Status.eq(status));
    }

    let (page, page_size) = page_bounds(query.page, query.page_size);
    let paginator = select
        .order_by_desc(salary::Column::DueDate)
        .paginate(state.db.as_ref(), page_size);
    let total = paginator.num_items().await?;
    let salaries = paginator.fetch_page(page).await?;

    Ok(Json(ApiResponse::success(SalaryList { salaries, total })))
}

/// POST /api/salaries
pub async fn create_salary(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateSalaryRequest>,
) -> AppResult<Json<ApiResponse<salary::Model>>> {
    user.require(perm::SALARIES_MANAGE)?;
    let net_pay = validate_amounts(req.basic_pay, req.bonuses, req.deductions)?;
    let currency = normalize_currency(&req.currency)?;
    let emp = find_employee(state.db.as_ref(), user.organization_id, req.employee_id).await?;
    ensure_period_free(&state, emp.id, req.due_date, None).await?;

    let status = req.status.unwrap_or(SalaryStatus::Pending);
    let now = Utc::now();
    let salary = salary::ActiveModel {
        organization_id: Set(user.organization_id),
        employee_id: Set(emp.id),
        basic_pay: Set(req.basic_pay),
        bonuses: Set(req.bonuses),
        deductions: Set(req.deductions),
        net_pay: Set(net_pay),
        currency: Set(currency),
        due_date: Set(req.due_date),
        payment_date: Set(payment_date_for(status, req.payment_date)),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(state.db.as_ref())
    .await?;

    tracing::info!(
        "HR-Admin {} created salary {} for {} due {}",
        user.email,
        salary.id,
        emp.email,
        salary.due_date
    );
    Ok(Json(ApiResponse::success(salary)))
}

/// GET /api/salaries/me
pub async fn my_salaries(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<salary::Model>>>> {
    user.require(perm::SALARIES_SELF)?;

    let salaries = salary::Entity::find()
        .filter(salary::Column::OrganizationId.eq(user.organization_id))
        .filter(salary::Column::EmployeeId.eq(user.id))
        .order_by_desc(salary::Column::DueDate)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(ApiResponse::success(salaries)))
}

/// GET /api/salaries/:id
pub async fn get_salary(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<salary::Model>>> {
    user.require(perm::SALARIES_MANAGE)?;
    let salary = find_salary(&state, user.organization_id, id).await?;
    Ok(Json(ApiResponse::success(salary)))
}

/// PATCH /api/salaries/:id
pub async fn update_salary(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSalaryRequest>,
) -> AppResult<Json<ApiResponse<salary::Model>>> {
    user.require(perm::SALARIES_MANAGE)?;
    let current = find_salary(&state, user.organization_id, id).await?;

    let basic_pay = req.basic_pay.unwrap_or(current.basic_pay);
    let bonuses = req.bonuses.unwrap_or(current.bonuses);
    let deductions = req.deductions.unwrap_or(current.deductions);
    let net_pay = validate_amounts(basic_pay, bonuses, deductions)?;
    let status = req.status.unwrap_or(current.status);

    let mut active = current.clone().into_active_model();
    if let Some(due_date) = req.due_date {
        if due_date != current.due_date {
            ensure_period_free(&state, current.employee_id, due_date, Some(id)).await?;
            active.due_date = Set(due_date);
        }
    }
    if let Some(currency) = req.currency {
        active.currency = Set(normalize_currency(&currency)?);
    }
    active.basic_pay = Set(basic_pay);
    active.bonuses = Set(bonuses);
    active.deductions = Set(deductions);
    active.net_pay = Set(net_pay);
    active.status = Set(status);
    active.payment_date = Set(payment_date_for(
        status,
        req.payment_date.or(current.payment_date),
    ));
    active.updated_at = Set(Utc::now());
    let salary = active.update(state.db.as_ref()).await?;

    tracing::info!(
        "HR-Admin {} updated salary {} ({:?})",
        user.email,
        salary.id,
        salary.status
    );
    Ok(Json(ApiResponse::success(salary)))
}

/// DELETE /api/salaries/:id
pub async fn delete_salary(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require(perm::SALARIES_MANAGE)?;
    let salary = find_salary(&state, user.organization_id, id).await?;

    salary::Entity::delete_by_id(salary.id).exec(state.db.as_ref()).await?;

    tracing::info!("HR-Admin {} deleted salary {}", user.email, salary.id);
    Ok(Json(ApiResponse::success_msg("salary deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_must_be_non_negative() {
        assert_eq!(validate_amounts(300_000, 10_000, 5_000).unwrap(), 305_000);
        assert!(validate_amounts(-1, 0, 0).is_err());
        assert!(validate_amounts(0, 0, -5).is_err());
        assert!(validate_amounts(i64::MAX, 1, 0).is_err());
    }

    #[test]
    fn currency_codes() {
        assert_eq!(normalize_currency(" bdt ").unwrap(), "BDT");
        assert!(normalize_currency("US").is_err());
        assert!(normalize_currency("U5D").is_err());
    }

    #[test]
    fn paid_salaries_get_a_payment_date() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(payment_date_for(SalaryStatus::Pending, None), None);
        assert_eq!(payment_date_for(SalaryStatus::Paid, Some(day)), Some(day));
        assert!(payment_date_for(SalaryStatus::Paid, None).is_some());
    }
}

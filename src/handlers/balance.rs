//! Balance ledger handlers

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;

use crate::entity::balance;
use crate::error::{require, AppError, AppResult, OptionExt};
use crate::middleware::auth::CurrentUser;
use crate::permission::perm;
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListBalancesQuery {
    pub expense_month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBalanceRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub available_amount: i64,
    #[serde(default)]
    pub total_expenses: i64,
    pub expense_month: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBalanceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub available_amount: Option<i64>,
    pub total_expenses: Option<i64>,
    pub expense_month: Option<String>,
}

fn check_month(month: &str) -> AppResult<()> {
    if !balance::is_valid_month(month) {
        return Err(AppError::Validation(format!(
            "expense_month '{}' must look like YYYY-MM",
            month
        )));
    }
    Ok(())
}

fn check_amount(value: i64, field: &str) -> AppResult<()> {
    if value < 0 {
        return Err(AppError::Validation(format!("{} cannot be negative", field)));
    }
    Ok(())
}

async fn find_balance(state: &AppState, organization_id: i64, id: i64) -> AppResult<balance::Model> {
    balance::Entity::find_by_id(id)
        .filter(balance::Column::OrganizationId.eq(organization_id))
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Balance entry {} not found", id))
}

/// GET /api/balances
pub async fn list_balances(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListBalancesQuery>,
) -> AppResult<Json<ApiResponse<Vec<balance::Model>>>> {
    user.require(perm::BALANCES_MANAGE)?;

    let mut select = balance::Entity::find()
        .filter(balance::Column::OrganizationId.eq(user.organization_id));
    if let Some(month) = query.expense_month {
        check_month(&month)?;
        select = select.filter(balance::Column::ExpenseMonth.eq(month));
    }
    let entries = select
        .order_by_desc(balance::Column::ExpenseMonth)
        .order_by_desc(balance::Column::CreatedAt)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(ApiResponse::success(entries)))
}

/// POST /api/balances
pub async fn create_balance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateBalanceRequest>,
) -> AppResult<Json<ApiResponse<balance::Model>>> {
    user.require(perm::BALANCES_MANAGE)?;
    require(&req.title, "title")?;
    check_month(&req.expense_month)?;
    check_amount(req.available_amount, "available_amount")?;
    check_amount(req.total_expenses, "total_expenses")?;

    let now = Utc::now();
    let entry = balance::ActiveModel {
        organization_id: Set(user.organization_id),
        title: Set(req.title.trim().to_string()),
        description: Set(req.description),
        available_amount: Set(req.available_amount),
        total_expenses: Set(req.total_expenses),
        expense_month: Set(req.expense_month),
        submitted_by: Set(user.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(state.db.as_ref())
    .await?;

    tracing::info!(
        "HR-Admin {} recorded balance entry {} for {}",
        user.email,
        entry.id,
        entry.expense_month
    );
    Ok(Json(ApiResponse::success(entry)))
}

/// GET /api/balances/:id
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<balance::Model>>> {
    user.require(perm::BALANCES_MANAGE)?;
    let entry = find_balance(&state, user.organization_id, id).await?;
    Ok(Json(ApiResponse::success(entry)))
}

/// PATCH /api/balances/:id
pub async fn update_balance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateBalanceRequest>,
) -> AppResult<Json<ApiResponse<balance::Model>>> {
    user.require(perm::BALANCES_MANAGE)?;
    let entry = find_balance(&state, user.organization_id, id).await?;

    let mut active = entry.into_active_model();
    if let Some(title) = req.title {
        require(&title, "title")?;
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = req.description {
        active.description = Set(description);
    }
    if let Some(amount) = req.available_amount {
        check_amount(amount, "available_amount")?;
        active.available_amount = Set(amount);
    }
    if let Some(expenses) = req.total_expenses {
        check_amount(expenses, "total_expenses")?;
        active.total_expenses = Set(expenses);
    }
    if let Some(month) = req.expense_month {
        check_month(&month)?;
        active.expense_month = Set(month);
    }
    active.updated_at = Set(Utc::now());
    let entry = active.update(state.db.as_ref()).await?;

    tracing::info!("HR-Admin {} updated balance entry {}", user.email, entry.id);
    Ok(Json(ApiResponse::success(entry)))
}

/// DELETE /api/balances/:id
pub async fn delete_balance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require(perm::BALANCES_MANAGE)?;
    let entry = find_balance(&state, user.organization_id, id).await?;

    balance::Entity::delete_by_id(entry.id).exec(state.db.as_ref()).await?;

    tracing::info!("HR-Admin {} deleted balance entry {}", user.email, entry.id);
    Ok(Json(ApiResponse::success_msg("balance entry deleted")))
}

//! HR-Admin profile handlers

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;

use crate::auth::{check_password_strength, hash_password, normalize_email};
use crate::entity::human_resource;
use crate::error::{require, AppError, AppResult, OptionExt};
use crate::handlers::{ensure_email_free, find_department};
use crate::middleware::auth::CurrentUser;
use crate::permission::perm;
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateHrRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub contact_number: String,
    pub department_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHrRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact_number: Option<String>,
    pub department_id: Option<i64>,
}

async fn find_hr(state: &AppState, organization_id: i64, id: i64) -> AppResult<human_resource::Model> {
    human_resource::Entity::find_by_id(id)
        .filter(human_resource::Column::OrganizationId.eq(organization_id))
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("HR profile {} not found", id))
}

/// GET /api/hr
pub async fn list_hr(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<human_resource::Model>>>> {
    user.require(perm::HR_MANAGE)?;

    let list = human_resource::Entity::find()
        .filter(human_resource::Column::OrganizationId.eq(user.organization_id))
        .order_by_asc(human_resource::Column::Id)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(ApiResponse::success(list)))
}

/// GET /api/hr/:id
pub async fn get_hr(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<human_resource::Model>>> {
    user.require(perm::HR_MANAGE)?;
    let hr = find_hr(&state, user.organization_id, id).await?;
    Ok(Json(ApiResponse::success(hr)))
}

/// POST /api/hr
pub async fn create_hr(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateHrRequest>,
) -> AppResult<Json<ApiResponse<human_resource::Model>>> {
    user.require(perm::HR_MANAGE)?;
    require(&req.first_name, "first_name")?;
    require(&req.last_name, "last_name")?;
    require(&req.contact_number, "contact_number")?;
    check_password_strength(&req.password)?;
    let email = normalize_email(&req.email)?;
    ensure_email_free(state.db.as_ref(), &email).await?;
    if let Some(dept_id) = req.department_id {
        find_department(state.db.as_ref(), user.organization_id, dept_id).await?;
    }

    let now = Utc::now();
    let hr = human_resource::ActiveModel {
        organization_id: Set(user.organization_id),
        first_name: Set(req.first_name.trim().to_string()),
        last_name: Set(req.last_name.trim().to_string()),
        email: Set(email),
        password: Set(hash_password(&req.password)?),
        contact_number: Set(req.contact_number.trim().to_string()),
        department_id: Set(req.department_id),
        is_verified: Set(true),
        verification_token_hash: Set(None),
        verification_expires_at: Set(None),
        reset_token_hash: Set(None),
        reset_expires_at: Set(None),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(state.db.as_ref())
    .await?;

    tracing::info!("HR-Admin {} added HR profile {}", user.email, hr.email);
    Ok(Json(ApiResponse::success(hr)))
}

/// PATCH /api/hr/:id
pub async fn update_hr(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateHrRequest>,
) -> AppResult<Json<ApiResponse<human_resource::Model>>> {
    user.require(perm::HR_MANAGE)?;
    let hr = find_hr(&state, user.organization_id, id).await?;

    let mut active = hr.into_active_model();
    if let Some(first_name) = req.first_name {
        require(&first_name, "first_name")?;
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = req.last_name {
        require(&last_name, "last_name")?;
        active.last_name = Set(last_name.trim().to_string());
    }
    if let Some(contact_number) = req.contact_number {
        active.contact_number = Set(contact_number.trim().to_string());
    }
    if let Some(dept_id) = req.department_id {
        find_department(state.db.as_ref(), user.organization_id, dept_id).await?;
        active.department_id = Set(Some(dept_id));
    }
    active.updated_at = Set(Utc::now());
    let hr = active.update(state.db.as_ref()).await?;

    tracing::info!("HR-Admin {} updated HR profile {}", user.email, hr.email);
    Ok(Json(ApiResponse::success(hr)))
}

/// DELETE /api/hr/:id
pub async fn delete_hr(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require(perm::HR_MANAGE)?;
    if id == user.id {
        return Err(AppError::BadRequest("cannot delete your own HR profile".to_string()));
    }
    let hr = find_hr(&state, user.organization_id, id).await?;

    human_resource::Entity::delete_by_id(hr.id).exec(state.db.as_ref()).await?;

    tracing::info!("HR-Admin {} deleted HR profile {}", user.email, hr.email);
    Ok(Json(ApiResponse::success_msg("HR profile deleted")))
}

//! Requisition handlers
//!
//! Employees raise requisitions (equipment, budget, access...) which HR-Admins
//! approve or deny.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::entity::generate_request::{self, RequestStatus};
use crate::error::{require, AppError, AppResult, OptionExt};
use crate::handlers::{default_page, default_page_size, page_bounds};
use crate::middleware::auth::CurrentUser;
use crate::permission::perm;
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<RequestStatus>,
    pub department_id: Option<i64>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub status: RequestStatus,
}

#[derive(Debug, Serialize)]
pub struct RequestList {
    pub requests: Vec<generate_request::Model>,
    pub total: u64,
}

/// GET /api/requests
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListRequestsQuery>,
) -> AppResult<Json<ApiResponse<RequestList>>> {
    let mut select = generate_request::Entity::find()
        .filter(generate_request::Column::OrganizationId.eq(user.organization_id));
    if user.is_hr() {
        user.require(perm::REQUESTS_DECIDE)?;
        if let Some(dept_id) = query.department_id {
            select = select.filter(generate_request::Column::DepartmentId.eq(dept_id));
        }
    } else {
        user.require(perm::REQUESTS_SELF)?;
        select = select.filter(generate_request::Column::EmployeeId.eq(user.id));
    }
    if let Some(status) = query.status {
        select = select.filter(generate_request::Column::Status.eq(status));
    }

    let (page, page_size) = page_bounds(query.page, query.page_size);
    let paginator = select
        .order_by_desc(generate_request::Column::CreatedAt)
        .paginate(state.db.as_ref(), page_size);
    let total = paginator.num_items().await?;
    let requests = paginator.fetch_page(page).await?;

    Ok(Json(ApiResponse::success(RequestList { requests, total })))
}

/// POST /api/requests
pub async fn create_request(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateRequestRequest>,
) -> AppResult<Json<ApiResponse<generate_request::Model>>> {
    user.require(perm::REQUESTS_SELF)?;
    require(&req.title, "title")?;
    require(&req.content, "content")?;

    let now = Utc::now();
    let request = generate_request::ActiveModel {
        organization_id: Set(user.organization_id),
        employee_id: Set(user.id),
        department_id: Set(user.department_id),
        title: Set(req.title.trim().to_string()),
        content: Set(req.content.trim().to_string()),
        status: Set(RequestStatus::Pending),
        approved_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(state.db.as_ref())
    .await?;

    tracing::info!("Employee {} raised request {}", user.email, request.id);
    Ok(Json(ApiResponse::success(request)))
}

/// GET /api/requests/:id
pub async fn get_request(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<generate_request::Model>>> {
    let mut select = generate_request::Entity::find_by_id(id)
        .filter(generate_request::Column::OrganizationId.eq(user.organization_id));
    if user.is_hr() {
        user.require(perm::REQUESTS_DECIDE)?;
    } else {
        user.require(perm::REQUESTS_SELF)?;
        select = select.filter(generate_request::Column::EmployeeId.eq(user.id));
    }
    let request = select
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Request {} not found", id))?;
    Ok(Json(ApiResponse::success(request)))
}

/// DELETE /api/requests/:id
pub async fn delete_request(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require(perm::REQUESTS_SELF)?;
    let request = generate_request::Entity::find_by_id(id)
        .filter(generate_request::Column::OrganizationId.eq(user.organization_id))
        .filter(generate_request::Column::EmployeeId.eq(user.id))
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Request {} not found", id))?;
    if request.status != RequestStatus::Pending {
        return Err(AppError::BadRequest(
            "only pending requests can be withdrawn".to_string(),
        ));
    }

    generate_request::Entity::delete_by_id(request.id)
        .exec(state.db.as_ref())
        .await?;

    tracing::info!("Employee {} withdrew request {}", user.email, request.id);
    Ok(Json(ApiResponse::success_msg("request withdrawn")))
}

/// PATCH /api/requests/:id/decision
pub async fn decide_request(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<DecisionRequest>,
) -> AppResult<Json<ApiResponse<generate_request::Model>>> {
    user.require(perm::REQUESTS_DECIDE)?;
    let request = generate_request::Entity::find_by_id(id)
        .filter(generate_request::Column::OrganizationId.eq(user.organization_id))
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Request {} not found", id))?;

    if !request.status.can_transition_to(req.status) {
        return Err(AppError::BadRequest(format!(
            "request is {:?} and cannot become {:?}",
            request.status, req.status
        )));
    }

    let now = Utc::now();
    let result = generate_request::Entity::update_many()
        .set(generate_request::ActiveModel {
            status: Set(req.status),
            approved_by: Set(Some(user.id)),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(generate_request::Column::Id.eq(request.id))
        .filter(generate_request::Column::Status.eq(RequestStatus::Pending))
        .exec(state.db.as_ref())
        .await?;
    if result.rows_affected != 1 {
        return Err(AppError::BadRequest(format!(
            "request {} has already been decided",
            request.id
        )));
    }

    let request = generate_request::Model {
        status: req.status,
        approved_by: Some(user.id),
        updated_at: now,
        ..request
    };

    tracing::info!(
        "HR-Admin {} marked request {} {:?}",
        user.email,
        request.id,
        request.status
    );
    Ok(Json(ApiResponse::success(request)))
}

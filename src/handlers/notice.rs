//! Notice handlers
//!
//! HR-Admins publish notices to everyone, one department or one employee.

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

use crate::entity::notice::{self, NoticeAudience};
use crate::error::{require, AppError, AppResult, OptionExt};
use crate::handlers::{find_department, find_employee};
use crate::middleware::auth::CurrentUser;
use crate::permission::perm;
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateNoticeRequest {
    pub title: String,
    pub content: String,
    pub audience: NoticeAudience,
    pub department_id: Option<i64>,
    pub employee_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoticeRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub audience: Option<NoticeAudience>,
    pub department_id: Option<i64>,
    pub employee_id: Option<i64>,
}

/// Resolve the target columns for an audience, checking the target exists.
async fn resolve_target(
    state: &AppState,
    organization_id: i64,
    audience: NoticeAudience,
    department_id: Option<i64>,
    employee_id: Option<i64>,
) -> AppResult<(Option<i64>, Option<i64>)> {
    match audience {
        NoticeAudience::All => Ok((None, None)),
        NoticeAudience::Department => {
            let id = department_id.ok_or_else(|| {
                AppError::Validation("department_id is required for this audience".to_string())
            })?;
            find_department(state.db.as_ref(), organization_id, id).await?;
            Ok((Some(id), None))
        }
        NoticeAudience::Employee => {
            let id = employee_id.ok_or_else(|| {
                AppError::Validation("employee_id is required for this audience".to_string())
            })?;
            find_employee(state.db.as_ref(), organization_id, id).await?;
            Ok((None, Some(id)))
        }
    }
}

async fn find_notice(state: &AppState, organization_id: i64, id: i64) -> AppResult<notice::Model> {
    notice::Entity::find_by_id(id)
        .filter(notice::Column::OrganizationId.eq(organization_id))
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Notice {} not found", id))
}

/// GET /api/notices
pub async fn list_notices(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<notice::Model>>>> {
    user.require(perm::NOTICES_MANAGE)?;

    let notices = notice::Entity::find()
        .filter(notice::Column::OrganizationId.eq(user.organization_id))
        .order_by_desc(notice::Column::CreatedAt)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(ApiResponse::success(notices)))
}

/// POST /api/notices
pub async fn create_notice(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateNoticeRequest>,
) -> AppResult<Json<ApiResponse<notice::Model>>> {
    user.require(perm::NOTICES_MANAGE)?;
    require(&req.title, "title")?;
    require(&req.content, "content")?;
    let (department_id, employee_id) = resolve_target(
        &state,
        user.organization_id,
        req.audience,
        req.department_id,
        req.employee_id,
    )
    .await?;

    let now = Utc::now();
    let notice = notice::ActiveModel {
        organization_id: Set(user.organization_id),
        title: Set(req.title.trim().to_string()),
        content: Set(req.content.trim().to_string()),
        audience: Set(req.audience),
        department_id: Set(department_id),
        employee_id: Set(employee_id),
        created_by: Set(user.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(state.db.as_ref())
    .await?;

    tracing::info!(
        "HR-Admin {} published notice {} to {:?}",
        user.email,
        notice.id,
        notice.audience
    );
    Ok(Json(ApiResponse::success(notice)))
}

/// GET /api/notices/me
pub async fn my_notices(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<notice::Model>>>> {
    user.require(perm::NOTICES_SELF)?;

    let notices = notice::Entity::find()
        .filter(notice::Column::OrganizationId.eq(user.organization_id))
        .order_by_desc(notice::Column::CreatedAt)
        .all(state.db.as_ref())
        .await?
        .into_iter()
        .filter(|n| n.is_addressed_to(user.id, user.department_id))
        .collect();
    Ok(Json(ApiResponse::success(notices)))
}

/// GET /api/notices/:id
pub async fn get_notice(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<notice::Model>>> {
    let notice = find_notice(&state, user.organization_id, id).await?;
    if user.is_hr() {
        user.require(perm::NOTICES_MANAGE)?;
    } else {
        user.require(perm::NOTICES_SELF)?;
        if !notice.is_addressed_to(user.id, user.department_id) {
            return Err(AppError::NotFound(format!("Notice {} not found", id)));
        }
    }
    Ok(Json(ApiResponse::success(notice)))
}

/// PATCH /api/notices/:id
pub async fn update_notice(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateNoticeRequest>,
) -> AppResult<Json<ApiResponse<notice::Model>>> {
    user.require(perm::NOTICES_MANAGE)?;
    let current = find_notice(&state, user.organization_id, id).await?;

    let audience = req.audience.unwrap_or(current.audience);
    let (department_id, employee_id) = resolve_target(
        &state,
        user.organization_id,
        audience,
        req.department_id.or(current.department_id),
        req.employee_id.or(current.employee_id),
    )
    .await?;

    let mut active = current.into_active_model();
    if let Some(title) = req.title {
        require(&title, "title")?;
        active.title = Set(title.trim().to_string());
    }
    if let Some(content) = req.content {
        require(&content, "content")?;
        active.content = Set(content.trim().to_string());
    }
    active.audience = Set(audience);
    active.department_id = Set(department_id);
    active.employee_id = Set(employee_id);
    active.updated_at = Set(Utc::now());
    let notice = active.update(state.db.as_ref()).await?;

    tracing::info!("HR-Admin {} updated notice {}", user.email, notice.id);
    Ok(Json(ApiResponse::success(notice)))
}

/// DELETE /api/notices/:id
pub async fn delete_notice(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require(perm::NOTICES_MANAGE)?;
    let notice = find_notice(&state, user.organization_id, id).await?;

    notice::Entity::delete_by_id(notice.id).exec(state.db.as_ref()).await?;

    tracing::info!("HR-Admin {} deleted notice {}", user.email, notice.id);
    Ok(Json(ApiResponse::success_msg("notice deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_uses_display_names_on_the_wire() {
        let req: CreateNoticeRequest = serde_json::from_str(
            r#"{"title":"Audit","content":"Friday","audience":"Department-Specific","department_id":4}"#,
        )
        .unwrap();
        assert_eq!(req.audience, NoticeAudience::Department);
        assert_eq!(req.department_id, Some(4));
        assert_eq!(req.employee_id, None);
    }
}

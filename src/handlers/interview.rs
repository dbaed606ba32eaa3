//! Interview handlers
//!
//! Applicant interviews run by HR-Admins, created one at a time or in bulk.
//! Applicants receive a scheduling mail for every created interview.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::auth::normalize_email;
use crate::entity::interview_insight::{self, InterviewStatus};
use crate::entity::human_resource;
use crate::error::{require, AppError, AppResult, OptionExt};
use crate::handlers::{default_page, default_page_size, page_bounds};
use crate::mail::templates;
use crate::middleware::auth::CurrentUser;
use crate::permission::perm;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Upper bound on items accepted by one bulk call
const MAX_BULK_ITEMS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ListInterviewsQuery {
    pub status: Option<InterviewStatus>,
    pub interviewer_id: Option<i64>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInterviewRequest {
    pub applicant_name: String,
    pub applicant_email: String,
    pub position: String,
    /// Defaults to the calling HR-Admin
    pub interviewer_id: Option<i64>,
    pub interview_date: DateTime<Utc>,
    pub status: Option<InterviewStatus>,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkInterviewRequest {
    pub interviews: Vec<CreateInterviewRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInterviewRequest {
    pub status: Option<InterviewStatus>,
    pub feedback: Option<String>,
    pub interview_date: Option<DateTime<Utc>>,
    pub interviewer_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct InterviewList {
    pub interviews: Vec<interview_insight::Model>,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub index: usize,
    pub applicant_email: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BulkResult {
    pub created: Vec<interview_insight::Model>,
    pub failed: Vec<BulkFailure>,
}

async fn ensure_interviewer(state: &AppState, organization_id: i64, id: i64) -> AppResult<()> {
    human_resource::Entity::find_by_id(id)
        .filter(human_resource::Column::OrganizationId.eq(organization_id))
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("interviewer {} is not an HR-Admin of this organization", id))?;
    Ok(())
}

async fn find_interview(
    state: &AppState,
    organization_id: i64,
    id: i64,
) -> AppResult<interview_insight::Model> {
    interview_insight::Entity::find_by_id(id)
        .filter(interview_insight::Column::OrganizationId.eq(organization_id))
        .one(state.db.as_ref())
        .await?
        .ok_or_not_found(format!("Interview {} not found", id))
}

/// Validate and store one interview, then queue the applicant mail.
async fn insert_interview(
    state: &AppState,
    user: &CurrentUser,
    req: CreateInterviewRequest,
) -> AppResult<interview_insight::Model> {
    require(&req.applicant_name, "applicant_name")?;
    require(&req.position, "position")?;
    let applicant_email = normalize_email(&req.applicant_email)?;
    let interviewer_id = req.interviewer_id.unwrap_or(user.id);
    ensure_interviewer(state, user.organization_id, interviewer_id).await?;

    let now = Utc::now();
    let interview = interview_insight::ActiveModel {
        organization_id: Set(user.organization_id),
        applicant_name: Set(req.applicant_name.trim().to_string()),
        applicant_email: Set(applicant_email),
        position: Set(req.position.trim().to_string()),
        interviewer_id: Set(interviewer_id),
        interview_date: Set(req.interview_date),
        status: Set(req.status.unwrap_or(InterviewStatus::Scheduled)),
        feedback: Set(req.feedback),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(state.db.as_ref())
    .await?;

    state.send_mail(templates::interview_scheduled(
        &interview.applicant_email,
        &interview.applicant_name,
        &interview.position,
        interview.interview_date,
    ));
    Ok(interview)
}

/// Client-facing reason for a failed bulk item; server faults stay in the log.
fn failure_reason(err: &AppError) -> String {
    if err.status().is_server_error() {
        "internal error".to_string()
    } else {
        err.to_string()
    }
}

/// GET /api/interviews
pub async fn list_interviews(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListInterviewsQuery>,
) -> AppResult<Json<ApiResponse<InterviewList>>> {
    user.require(perm::INTERVIEWS_MANAGE)?;

    let mut select = interview_insight::Entity::find()
        .filter(interview_insight::Column::OrganizationId.eq(user.organization_id));
    if let Some(status) = query.status {
        select = select.filter(interview_insight::Column::Status.eq(status));
    }
    if let Some(interviewer_id) = query.interviewer_id {
        select = select.filter(interview_insight::Column::InterviewerId.eq(interviewer_id));
    }

    let (page, page_size) = page_bounds(query.page, query.page_size);
    let paginator = select
        .order_by_asc(interview_insight::Column::InterviewDate)
        .paginate(state.db.as_ref(), page_size);
    let total = paginator.num_items().await?;
    let interviews = paginator.fetch_page(page).await?;

    Ok(Json(ApiResponse::success(InterviewList { interviews, total })))
}

/// POST /api/interviews
pub async fn create_interview(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateInterviewRequest>,
) -> AppResult<Json<ApiResponse<interview_insight::Model>>> {
    user.require(perm::INTERVIEWS_MANAGE)?;
    let interview = insert_interview(&state, &user, req).await?;

    tracing::info!(
        "HR-Admin {} scheduled interview {} for {}",
        user.email,
        interview.id,
        interview.applicant_email
    );
    Ok(Json(ApiResponse::success(interview)))
}

/// POST /api/interviews/bulk
pub async fn create_interviews_bulk(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<BulkInterviewRequest>,
) -> AppResult<Json<ApiResponse<BulkResult>>> {
    user.require(perm::INTERVIEWS_MANAGE)?;
    if req.interviews.is_empty() {
        return Err(AppError::Validation("interviews cannot be empty".to_string()));
    }
    if req.interviews.len() > MAX_BULK_ITEMS {
        return Err(AppError::Validation(format!(
            "at most {} interviews per request",
            MAX_BULK_ITEMS
        )));
    }

    let mut result = BulkResult {
        created: Vec::new(),
        failed: Vec::new(),
    };
    for (index, item) in req.interviews.into_iter().enumerate() {
        let applicant_email = item.applicant_email.clone();
        match insert_interview(&state, &user, item).await {
            Ok(interview) => result.created.push(interview),
            Err(e) => {
                tracing::warn!("Bulk interview item {} rejected: {}", index, e);
                result.failed.push(BulkFailure {
                    index,
                    applicant_email,
                    error: failure_reason(&e),
                });
            }
        }
    }

    tracing::info!(
        "HR-Admin {} bulk-scheduled interviews: {} created, {} failed",
        user.email,
        result.created.len(),
        result.failed.len()
    );
    Ok(Json(ApiResponse::success(result)))
}

/// GET /api/interviews/:id
pub async fn get_interview(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<interview_insight::Model>>> {
    user.require(perm::INTERVIEWS_MANAGE)?;
    let interview = find_interview(&state, user.organization_id, id).await?;
    Ok(Json(ApiResponse::success(interview)))
}

/// PATCH /api/interviews/:id
pub async fn update_interview(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateInterviewRequest>,
) -> AppResult<Json<ApiResponse<interview_insight::Model>>> {
    user.require(perm::INTERVIEWS_MANAGE)?;
    let interview = find_interview(&state, user.organization_id, id).await?;

    let mut active = interview.into_active_model();
    if let Some(status) = req.status {
        active.status = Set(status);
    }
    if let Some(feedback) = req.feedback {
        active.feedback = Set(feedback);
    }
    if let Some(date) = req.interview_date {
        active.interview_date = Set(date);
    }
    if let Some(interviewer_id) = req.interviewer_id {
        ensure_interviewer(&state, user.organization_id, interviewer_id).await?;
        active.interviewer_id = Set(interviewer_id);
    }
    active.updated_at = Set(Utc::now());
    let interview = active.update(state.db.as_ref()).await?;

    tracing::info!(
        "HR-Admin {} updated interview {} ({:?})",
        user.email,
        interview.id,
        interview.status
    );
    Ok(Json(ApiResponse::success(interview)))
}

/// DELETE /api/interviews/:id
pub async fn delete_interview(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require(perm::INTERVIEWS_MANAGE)?;
    let interview = find_interview(&state, user.organization_id, id).await?;

    interview_insight::Entity::delete_by_id(interview.id)
        .exec(state.db.as_ref())
        .await?;

    tracing::info!("HR-Admin {} deleted interview {}", user.email, interview.id);
    Ok(Json(ApiResponse::success_msg("interview deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_faults_are_not_echoed_to_clients() {
        let db = AppError::Database(sea_orm::DbErr::Custom("relation missing".into()));
        assert_eq!(failure_reason(&db), "internal error");

        let invalid = AppError::Validation("position is required".into());
        assert!(failure_reason(&invalid).contains("position is required"));
    }

    #[test]
    fn bulk_body_parses() {
        let req: BulkInterviewRequest = serde_json::from_str(
            r#"{"interviews":[{"applicant_name":"Lin","applicant_email":"lin@example.com","position":"QA","interview_date":"2024-06-01T09:30:00Z"}]}"#,
        )
        .unwrap();
        assert_eq!(req.interviews.len(), 1);
        assert_eq!(req.interviews[0].interviewer_id, None);
        assert!(req.interviews[0].feedback.is_empty());
    }
}

//! Unread counters
//!
//! Each account keeps a last-viewed timestamp per section. Counts cover
//! items strictly newer than that timestamp.

use axum::{extract::State, response::Json, Extension};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use serde::{Deserialize, Serialize};

use crate::entity::generate_request::{self, RequestStatus};
use crate::entity::leave::{self, LeaveStatus};
use crate::entity::notice;
use crate::entity::notification_view::{self, Principal, Section};
use crate::error::AppResult;
use crate::middleware::auth::CurrentUser;
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MarkViewedRequest {
    pub section: Section,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct NotificationCounts {
    pub notices: u64,
    pub leaves: u64,
    pub requests: u64,
}

async fn view_of<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
) -> AppResult<Option<notification_view::Model>> {
    Ok(notification_view::Entity::find()
        .filter(notification_view::Column::Principal.eq(user.principal))
        .filter(notification_view::Column::UserId.eq(user.id))
        .one(db)
        .await?)
}

/// Last time the section was viewed. Never viewed counts from the epoch.
fn last_viewed(view: Option<&notification_view::Model>, section: Section) -> DateTime<Utc> {
    view.map(|v| v.viewed_at(section)).unwrap_or_default()
}

/// Counts for an HR-Admin: everything filed in the organization.
async fn hr_counts<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    since: impl Fn(Section) -> DateTime<Utc>,
) -> AppResult<NotificationCounts> {
    let notices = notice::Entity::find()
        .filter(notice::Column::OrganizationId.eq(user.organization_id))
        .filter(notice::Column::CreatedAt.gt(since(Section::Notices)))
        .count(db)
        .await?;
    let leaves = leave::Entity::find()
        .filter(leave::Column::OrganizationId.eq(user.organization_id))
        .filter(leave::Column::CreatedAt.gt(since(Section::Leaves)))
        .count(db)
        .await?;
    let requests = generate_request::Entity::find()
        .filter(generate_request::Column::OrganizationId.eq(user.organization_id))
        .filter(generate_request::Column::CreatedAt.gt(since(Section::Requests)))
        .count(db)
        .await?;
    Ok(NotificationCounts {
        notices,
        leaves,
        requests,
    })
}

/// Counts for an employee: notices addressed to them and decisions on
/// their own leaves and requests.
async fn employee_counts<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    since: impl Fn(Section) -> DateTime<Utc>,
) -> AppResult<NotificationCounts> {
    let notices = notice::Entity::find()
        .filter(notice::Column::OrganizationId.eq(user.organization_id))
        .filter(notice::Column::CreatedAt.gt(since(Section::Notices)))
        .all(db)
        .await?
        .iter()
        .filter(|n| n.is_addressed_to(user.id, user.department_id))
        .count() as u64;
    let leaves = leave::Entity::find()
        .filter(leave::Column::EmployeeId.eq(user.id))
        .filter(leave::Column::Status.ne(LeaveStatus::Pending))
        .filter(leave::Column::UpdatedAt.gt(since(Section::Leaves)))
        .count(db)
        .await?;
    let requests = generate_request::Entity::find()
        .filter(generate_request::Column::EmployeeId.eq(user.id))
        .filter(generate_request::Column::Status.ne(RequestStatus::Pending))
        .filter(generate_request::Column::UpdatedAt.gt(since(Section::Requests)))
        .count(db)
        .await?;
    Ok(NotificationCounts {
        notices,
        leaves,
        requests,
    })
}

pub(crate) async fn unread_counts<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
) -> AppResult<NotificationCounts> {
    let view = view_of(db, user).await?;
    let since = |section: Section| last_viewed(view.as_ref(), section);

    match user.principal {
        Principal::Hr => hr_counts(db, user, since).await,
        Principal::Employee => employee_counts(db, user, since).await,
    }
}

/// Stamp `section` as viewed at `now`. The first call creates the row with
/// the other sections at the epoch. Later calls, including concurrent
/// first calls, only move the one column.
pub(crate) async fn record_view<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    section: Section,
    now: DateTime<Utc>,
) -> AppResult<notification_view::Model> {
    let at = |s: Section| if s == section { now } else { DateTime::<Utc>::default() };
    let column = match section {
        Section::Notices => notification_view::Column::NoticesViewedAt,
        Section::Leaves => notification_view::Column::LeavesViewedAt,
        Section::Requests => notification_view::Column::RequestsViewedAt,
    };

    let view = notification_view::Entity::insert(notification_view::ActiveModel {
        principal: Set(user.principal),
        user_id: Set(user.id),
        notices_viewed_at: Set(at(Section::Notices)),
        leaves_viewed_at: Set(at(Section::Leaves)),
        requests_viewed_at: Set(at(Section::Requests)),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::columns([
            notification_view::Column::Principal,
            notification_view::Column::UserId,
        ])
        .update_column(column)
        .to_owned(),
    )
    .exec_with_returning(db)
    .await?;
    Ok(view)
}

/// GET /api/notifications/counts
pub async fn counts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<NotificationCounts>>> {
    let counts = unread_counts(state.db.as_ref(), &user).await?;
    Ok(Json(ApiResponse::success(counts)))
}

/// POST /api/notifications/mark-viewed
pub async fn mark_viewed(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<MarkViewedRequest>,
) -> AppResult<Json<ApiResponse<notification_view::Model>>> {
    let view = record_view(state.db.as_ref(), &user, req.section, Utc::now()).await?;

    tracing::debug!("{:?} {} viewed {:?}", user.principal, user.email, req.section);
    Ok(Json(ApiResponse::success(view)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::notice::NoticeAudience;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn user(principal: Principal) -> CurrentUser {
        CurrentUser {
            id: 7,
            principal,
            organization_id: 1,
            role: "Employee".to_string(),
            name: "Alan Turing".to_string(),
            email: "alan@example.com".to_string(),
            department_id: Some(3),
            permissions: Vec::new(),
        }
    }

    fn view(principal: Principal, notices_at: DateTime<Utc>) -> notification_view::Model {
        notification_view::Model {
            id: 1,
            principal,
            user_id: 7,
            notices_viewed_at: notices_at,
            leaves_viewed_at: DateTime::<Utc>::default(),
            requests_viewed_at: DateTime::<Utc>::default(),
        }
    }

    fn count(n: i64) -> Vec<BTreeMap<&'static str, Value>> {
        vec![BTreeMap::from([("num_items", Value::BigInt(Some(n)))])]
    }

    fn notice_at(
        id: i64,
        audience: NoticeAudience,
        employee_id: Option<i64>,
        at: DateTime<Utc>,
    ) -> notice::Model {
        notice::Model {
            id,
            organization_id: 1,
            title: "Notice".into(),
            content: "Body".into(),
            audience,
            department_id: None,
            employee_id,
            created_by: 5,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn section_names_are_lowercase() {
        let req: MarkViewedRequest = serde_json::from_str(r#"{"section":"leaves"}"#).unwrap();
        assert_eq!(req.section, Section::Leaves);
        assert!(serde_json::from_str::<MarkViewedRequest>(r#"{"section":"Leaves"}"#).is_err());
    }

    #[test]
    fn never_viewed_counts_from_the_epoch() {
        let at = Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap();
        let v = view(Principal::Hr, at);
        assert_eq!(last_viewed(None, Section::Notices), DateTime::<Utc>::default());
        assert_eq!(last_viewed(Some(&v), Section::Notices), at);
        assert_eq!(last_viewed(Some(&v), Section::Leaves), DateTime::<Utc>::default());
    }

    #[tokio::test]
    async fn counts_are_zero_right_after_marking_viewed() {
        let viewed_at = Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![view(Principal::Hr, viewed_at)]])
            .append_query_results([vec![view(Principal::Hr, viewed_at)]])
            .append_query_results([count(0)])
            .append_query_results([count(0)])
            .append_query_results([count(0)])
            .into_connection();
        let hr = user(Principal::Hr);

        let stored = record_view(&db, &hr, Section::Notices, viewed_at).await.unwrap();
        assert_eq!(stored.notices_viewed_at, viewed_at);

        let counts = unread_counts(&db, &hr).await.unwrap();
        assert_eq!(counts, NotificationCounts::default());

        // The upsert only touches the viewed section and the notice count
        // is bounded by the stored timestamp.
        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("ON CONFLICT"));
        assert!(log.contains(r#"\"created_at\" > $"#));
        assert!(log.contains(&format!("{:?}", viewed_at)));
    }

    #[tokio::test]
    async fn employee_counts_only_addressed_notices_after_the_view() {
        let viewed_at = Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 7, 2, 9, 0, 0).unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![view(Principal::Employee, viewed_at)]])
            .append_query_results([vec![
                notice_at(1, NoticeAudience::All, None, later),
                notice_at(2, NoticeAudience::Employee, Some(7), later),
                notice_at(3, NoticeAudience::Employee, Some(8), later),
            ]])
            .append_query_results([count(1)])
            .append_query_results([count(0)])
            .into_connection();

        let counts = unread_counts(&db, &user(Principal::Employee)).await.unwrap();
        assert_eq!(
            counts,
            NotificationCounts {
                notices: 2,
                leaves: 1,
                requests: 0,
            }
        );

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains(&format!("{:?}", viewed_at)));
        assert!(log.contains(r#"\"updated_at\" > $"#));
    }

    #[test]
    fn counts_serialize_flat() {
        let json = serde_json::to_value(NotificationCounts {
            notices: 2,
            leaves: 0,
            requests: 1,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"notices": 2, "leaves": 0, "requests": 1}));
    }
}

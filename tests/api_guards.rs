use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, Utc};
use hrdesk::{
    auth::{issue_token, EMPLOYEE_COOKIE, HR_COOKIE},
    create_router,
    entity::{
        department,
        employee::{self, EmployeeRole, EmployeeStatus},
        generate_request::{self, RequestStatus},
        human_resource,
        interview_insight::{self, InterviewStatus},
        leave::{self, LeaveStatus},
        notification_view::Principal,
    },
    mail::{LogMailer, MailQueue},
    permission::PermissionEnforcer,
    AppState, Config,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value as DbValue};
use std::collections::BTreeMap;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

const ORG: i64 = 1;

async fn app(db: DatabaseConnection) -> (Router, Config) {
    let config = Config::default();
    let perm = PermissionEnforcer::new().await.unwrap();
    let mail = MailQueue::start(Arc::new(LogMailer));
    let state = AppState::new(db, perm, config.clone(), mail);
    (create_router(state), config)
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn hr_row(id: i64) -> human_resource::Model {
    let now = Utc::now();
    human_resource::Model {
        id,
        organization_id: ORG,
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
        email: "grace@example.com".into(),
        password: String::new(),
        contact_number: "555-0100".into(),
        department_id: None,
        is_verified: true,
        verification_token_hash: None,
        verification_expires_at: None,
        reset_token_hash: None,
        reset_expires_at: None,
        last_login: None,
        created_at: now,
        updated_at: now,
    }
}

fn employee_row(id: i64, role: EmployeeRole, status: EmployeeStatus) -> employee::Model {
    let now = Utc::now();
    employee::Model {
        id,
        organization_id: ORG,
        first_name: "Alan".into(),
        last_name: "Turing".into(),
        email: format!("alan{}@example.com", id),
        password: String::new(),
        contact_number: "555-0101".into(),
        role,
        status,
        department_id: Some(3),
        is_verified: true,
        reset_token_hash: None,
        reset_expires_at: None,
        last_login: None,
        created_at: now,
        updated_at: now,
    }
}

fn cookie(config: &Config, principal: Principal, id: i64) -> String {
    let token = issue_token(&config.jwt, principal, id, ORG).unwrap();
    let name = match principal {
        Principal::Hr => HR_COOKIE,
        Principal::Employee => EMPLOYEE_COOKIE,
    };
    format!("{}={}", name, token)
}

fn count_row(n: i64) -> Vec<BTreeMap<&'static str, DbValue>> {
    vec![BTreeMap::from([("num_items", DbValue::BigInt(Some(n)))])]
}

fn pending_leave(id: i64) -> leave::Model {
    let now = Utc::now();
    let day = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
    leave::Model {
        id,
        organization_id: ORG,
        employee_id: 7,
        title: "Vacation".into(),
        reason: "Family trip".into(),
        start_date: day,
        end_date: day,
        status: LeaveStatus::Pending,
        approved_by: None,
        created_at: now,
        updated_at: now,
    }
}

fn signup_request() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/hr/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"first_name":"Grace","last_name":"Hopper","email":"Grace@Example.com",
                "password":"correct-horse","contact_number":"555-0100",
                "organization_name":"Navy"}"#,
        ))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = app(empty_db()).await;

    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn api_requires_a_session() {
    let (app, _) = app(empty_db()).await;

    let response = app
        .oneshot(Request::builder().uri("/api/employees").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], 401);
}

#[tokio::test]
async fn token_in_the_wrong_cookie_is_rejected() {
    let (app, config) = app(empty_db()).await;
    let hr_token = issue_token(&config.jwt, Principal::Hr, 5, ORG).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/employees/me")
                .header(header::COOKIE, format!("{}={}", EMPLOYEE_COOKIE, hr_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_paths_fall_back_to_404() {
    let (app, _) = app(empty_db()).await;

    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn employees_cannot_reach_hr_routes() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![employee_row(7, EmployeeRole::Employee, EmployeeStatus::Active)]])
        .into_connection();
    let (app, config) = app(db).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/employees")
                .header(header::COOKIE, cookie(&config, Principal::Employee, 7))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], 403);
}

#[tokio::test]
async fn plain_employees_cannot_open_the_manager_panel() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![employee_row(7, EmployeeRole::Employee, EmployeeStatus::Active)]])
        .into_connection();
    let (app, config) = app(db).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/manager/team")
                .header(header::COOKIE, cookie(&config, Principal::Employee, 7))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inactive_employee_sessions_are_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![employee_row(7, EmployeeRole::Employee, EmployeeStatus::Inactive)]])
        .into_connection();
    let (app, config) = app(db).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/employees/me")
                .header(header::COOKIE, cookie(&config, Principal::Employee, 7))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn departments_list_with_member_counts() {
    let now = Utc::now();
    let finance = department::Model {
        id: 3,
        organization_id: ORG,
        name: "Finance".into(),
        description: String::new(),
        manager_id: None,
        created_at: now,
        updated_at: now,
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![hr_row(5)]])
        .append_query_results([vec![finance]])
        .append_query_results([vec![
            employee_row(7, EmployeeRole::Employee, EmployeeStatus::Active),
            employee_row(8, EmployeeRole::Manager, EmployeeStatus::Active),
        ]])
        .into_connection();
    let (app, config) = app(db).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/departments")
                .header(header::COOKIE, cookie(&config, Principal::Hr, 5))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"][0]["name"], "Finance");
    assert_eq!(json["data"][0]["member_count"], 2);
}

#[tokio::test]
async fn decided_leaves_cannot_be_decided_again() {
    let now = Utc::now();
    let day = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
    let approved = leave::Model {
        id: 11,
        organization_id: ORG,
        employee_id: 7,
        title: "Vacation".into(),
        reason: "Family trip".into(),
        start_date: day,
        end_date: day,
        status: LeaveStatus::Approved,
        approved_by: Some(5),
        created_at: now,
        updated_at: now,
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![hr_row(5)]])
        .append_query_results([vec![approved]])
        .into_connection();
    let (app, config) = app(db).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/leaves/11/decision")
                .header(header::COOKIE, cookie(&config, Principal::Hr, 5))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"status":"Rejected"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn leave_end_cannot_precede_start() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![employee_row(7, EmployeeRole::Employee, EmployeeStatus::Active)]])
        .into_connection();
    let (app, config) = app(db).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/leaves")
                .header(header::COOKIE, cookie(&config, Principal::Employee, 7))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"title":"Trip","reason":"Travel","start_date":"2024-07-10","end_date":"2024-07-08"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Validation Error");
}

#[tokio::test]
async fn signup_rejects_an_email_held_by_an_hr_admin() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([count_row(1)])
        .append_query_results([count_row(0)])
        .into_connection();
    let (app, _) = app(db).await;

    let response = app.oneshot(signup_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let json = body_json(response).await;
    assert_eq!(json["code"], 409);
}

#[tokio::test]
async fn signup_rejects_an_email_held_by_an_employee() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([count_row(0)])
        .append_query_results([count_row(1)])
        .into_connection();
    let (app, _) = app(db).await;

    let response = app.oneshot(signup_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn bulk_interviews_report_each_item() {
    let when = Utc::now();
    let scheduled = interview_insight::Model {
        id: 40,
        organization_id: ORG,
        applicant_name: "Ada".into(),
        applicant_email: "ada@example.com".into(),
        position: "Engineer".into(),
        interviewer_id: 5,
        interview_date: when,
        status: InterviewStatus::Scheduled,
        feedback: String::new(),
        created_at: when,
        updated_at: when,
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![hr_row(5)]])
        .append_query_results([vec![hr_row(5)]])
        .append_query_results([vec![scheduled]])
        .append_query_results([Vec::<human_resource::Model>::new()])
        .into_connection();
    let (app, config) = app(db).await;

    let body = serde_json::json!({
        "interviews": [
            {"applicant_name": "Ada", "applicant_email": "ada@example.com",
             "position": "Engineer", "interview_date": when},
            {"applicant_name": "Bob", "applicant_email": "bob@example.com",
             "position": "Analyst", "interviewer_id": 99, "interview_date": when},
        ]
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/interviews/bulk")
                .header(header::COOKIE, cookie(&config, Principal::Hr, 5))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let created = json["data"]["created"].as_array().unwrap();
    let failed = json["data"]["failed"].as_array().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["id"], 40);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["index"], 1);
    assert_eq!(failed[0]["applicant_email"], "bob@example.com");
    assert!(failed[0]["error"].as_str().unwrap().contains("interviewer 99"));
}

fn decide(config: &Config, id: i64, status: &str) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(format!("/api/leaves/{}/decision", id))
        .header(header::COOKIE, cookie(config, Principal::Hr, 5))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!(r#"{{"status":"{}"}}"#, status)))
        .unwrap()
}

#[tokio::test]
async fn pending_leave_is_approved() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![hr_row(5)]])
        .append_query_results([vec![pending_leave(12)]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();
    let (app, config) = app(db).await;

    let response = app.oneshot(decide(&config, 12, "Approved")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "Approved");
    assert_eq!(json["data"]["approved_by"], 5);
}

#[tokio::test]
async fn leave_decided_by_someone_else_meanwhile_is_rejected() {
    // The row read as Pending, but the guarded update matched nothing.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![hr_row(5)]])
        .append_query_results([vec![pending_leave(12)]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();
    let (app, config) = app(db).await;

    let response = app.oneshot(decide(&config, 12, "Rejected")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], 400);
}

#[tokio::test]
async fn request_decided_by_someone_else_meanwhile_is_rejected() {
    let now = Utc::now();
    let pending = generate_request::Model {
        id: 21,
        organization_id: ORG,
        employee_id: 7,
        department_id: Some(3),
        title: "Laptop".into(),
        content: "Replacement laptop".into(),
        status: RequestStatus::Pending,
        approved_by: None,
        created_at: now,
        updated_at: now,
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![hr_row(5)]])
        .append_query_results([vec![pending]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();
    let (app, config) = app(db).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/requests/21/decision")
                .header(header::COOKIE, cookie(&config, Principal::Hr, 5))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"status":"Denied"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

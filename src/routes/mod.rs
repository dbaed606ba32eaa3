use axum::{
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::middleware::auth_layer;
use crate::state::AppState;

pub mod health;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn success_msg(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();
    // Credentialed requests (cookies) need explicit origins and headers.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true)
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/hr/signup", post(auth::hr_signup))
        .route("/hr/login", post(auth::hr_login))
        .route("/hr/logout", post(auth::hr_logout))
        .route("/hr/check", get(auth::hr_check))
        .route("/hr/verify-email", post(auth::verify_email))
        .route("/hr/resend-verify-email", post(auth::resend_verify_email))
        .route("/hr/forgot-password", post(auth::hr_forgot_password))
        .route("/hr/reset-password/:token", post(auth::hr_reset_password))
        .route("/employee/login", post(auth::employee_login))
        .route("/employee/logout", post(auth::employee_logout))
        .route("/employee/check", get(auth::employee_check))
        .route("/employee/forgot-password", post(auth::employee_forgot_password))
        .route("/employee/reset-password/:token", post(auth::employee_reset_password))
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .nest("/auth", auth_routes())
        // HR-Admin profiles
        .route("/hr", get(handlers::hr::list_hr).post(handlers::hr::create_hr))
        .route(
            "/hr/:id",
            get(handlers::hr::get_hr)
                .patch(handlers::hr::update_hr)
                .delete(handlers::hr::delete_hr),
        )
        // Employees
        .route(
            "/employees",
            get(handlers::employee::list_employees).post(handlers::employee::create_employee),
        )
        .route(
            "/employees/me",
            get(handlers::employee::get_me).patch(handlers::employee::update_me),
        )
        .route(
            "/employees/:id",
            get(handlers::employee::get_employee)
                .patch(handlers::employee::update_employee)
                .delete(handlers::employee::deactivate_employee),
        )
        .route("/employees/:id/reactivate", post(handlers::employee::reactivate_employee))
        // Departments
        .route(
            "/departments",
            get(handlers::department::list_departments)
                .post(handlers::department::create_department),
        )
        .route(
            "/departments/:id",
            get(handlers::department::get_department)
                .patch(handlers::department::update_department)
                .delete(handlers::department::delete_department),
        )
        .route("/departments/:id/employees", post(handlers::department::assign_employee))
        .route(
            "/departments/:id/employees/:employee_id",
            axum::routing::delete(handlers::department::remove_employee),
        )
        .route("/departments/:id/manager", post(handlers::department::set_manager))
        // Attendance
        .route("/attendance", get(handlers::attendance::list_attendance))
        .route("/attendance/initialize", post(handlers::attendance::initialize))
        .route("/attendance/update", patch(handlers::attendance::update_attendance))
        .route("/attendance/me", get(handlers::attendance::my_attendance))
        .route("/attendance/me/check-in", post(handlers::attendance::check_in))
        .route("/attendance/me/check-out", post(handlers::attendance::check_out))
        .route(
            "/attendance/:id",
            get(handlers::attendance::get_attendance)
                .delete(handlers::attendance::delete_attendance),
        )
        // Leaves
        .route(
            "/leaves",
            get(handlers::leave::list_leaves).post(handlers::leave::create_leave),
        )
        .route(
            "/leaves/:id",
            get(handlers::leave::get_leave).delete(handlers::leave::delete_leave),
        )
        .route("/leaves/:id/decision", patch(handlers::leave::decide_leave))
        // Requisitions
        .route(
            "/requests",
            get(handlers::request::list_requests).post(handlers::request::create_request),
        )
        .route(
            "/requests/:id",
            get(handlers::request::get_request).delete(handlers::request::delete_request),
        )
        .route("/requests/:id/decision", patch(handlers::request::decide_request))
        // Salaries
        .route(
            "/salaries",
            get(handlers::salary::list_salaries).post(handlers::salary::create_salary),
        )
        .route("/salaries/me", get(handlers::salary::my_salaries))
        .route(
            "/salaries/:id",
            get(handlers::salary::get_salary)
                .patch(handlers::salary::update_salary)
                .delete(handlers::salary::delete_salary),
        )
        // Notices
        .route(
            "/notices",
            get(handlers::notice::list_notices).post(handlers::notice::create_notice),
        )
        .route("/notices/me", get(handlers::notice::my_notices))
        .route(
            "/notices/:id",
            get(handlers::notice::get_notice)
                .patch(handlers::notice::update_notice)
                .delete(handlers::notice::delete_notice),
        )
        // Interviews
        .route(
            "/interviews",
            get(handlers::interview::list_interviews).post(handlers::interview::create_interview),
        )
        .route("/interviews/bulk", post(handlers::interview::create_interviews_bulk))
        .route(
            "/interviews/:id",
            get(handlers::interview::get_interview)
                .patch(handlers::interview::update_interview)
                .delete(handlers::interview::delete_interview),
        )
        // Balance ledger
        .route(
            "/balances",
            get(handlers::balance::list_balances).post(handlers::balance::create_balance),
        )
        .route(
            "/balances/:id",
            get(handlers::balance::get_balance)
                .patch(handlers::balance::update_balance)
                .delete(handlers::balance::delete_balance),
        )
        // Manager panel
        .route("/manager/team", get(handlers::manager::team))
        .route(
            "/manager/tasks",
            get(handlers::manager::list_tasks).post(handlers::manager::create_task),
        )
        .route(
            "/manager/tasks/:id",
            patch(handlers::manager::update_task).delete(handlers::manager::delete_task),
        )
        .route(
            "/manager/reviews",
            get(handlers::manager::list_reviews).post(handlers::manager::create_review),
        )
        .route("/manager/performance", get(handlers::manager::team_performance))
        .route("/manager/performance/:id", get(handlers::manager::employee_performance))
        // Employee tasks
        .route("/tasks/me", get(handlers::task::my_tasks))
        .route("/tasks/:id", get(handlers::task::get_task))
        .route("/tasks/:id/status", patch(handlers::task::update_status))
        .route("/tasks/:id/comments", post(handlers::task::add_comment))
        // Notifications
        .route("/notifications/counts", get(handlers::notification::counts))
        .route("/notifications/mark-viewed", post(handlers::notification::mark_viewed))
        // Dashboards
        .route("/dashboard", get(handlers::dashboard::org_dashboard))
        .route("/dashboard/me", get(handlers::dashboard::my_dashboard));

    Router::new()
        .nest("/api", api_routes)
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Fallback handler for 404
pub async fn fallback() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse {
            success: false,
            message: "Not Found".to_string(),
            data: None,
        }),
    )
}

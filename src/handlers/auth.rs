//! Authentication handlers
//!
//! HR-Admin signup, login and email verification; employee login; password
//! reset for both account kinds. Sessions are JWTs in httpOnly cookies.

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::auth::{
    check_password_strength, hash_password, hash_token, issue_token, normalize_email,
    one_time_token, verify_password, RESET_TOKEN_HOURS, VERIFY_TOKEN_HOURS,
};
use crate::entity::notification_view::Principal;
use crate::entity::{employee, human_resource, organization};
use crate::error::{require, AppError, AppResult};
use crate::handlers::ensure_email_free;
use crate::mail::templates;
use crate::middleware::auth::CurrentUser;
use crate::routes::ApiResponse;
use crate::state::AppState;

const HR_RESET_PATH: &str = "auth/reset-password";
const EMPLOYEE_RESET_PATH: &str = "auth/employee/reset-password";

/// HR-Admin signup request; creates the organization as well
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub contact_number: String,
    pub organization_name: String,
    #[serde(default)]
    pub organization_description: String,
    #[serde(default)]
    pub organization_olink: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Who is logged in
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub id: i64,
    pub principal: Principal,
    pub role: String,
    pub name: String,
    pub email: String,
    pub organization_id: i64,
    pub department_id: Option<i64>,
    pub permissions: Vec<String>,
}

impl From<CurrentUser> for SessionInfo {
    fn from(u: CurrentUser) -> Self {
        Self {
            id: u.id,
            principal: u.principal,
            role: u.role,
            name: u.name,
            email: u.email,
            organization_id: u.organization_id,
            department_id: u.department_id,
            permissions: u.permissions,
        }
    }
}

fn session_cookie(state: &AppState, principal: Principal, token: String) -> Cookie<'static> {
    Cookie::build((principal.cookie_name(), token))
        .path("/")
        .http_only(true)
        .secure(state.config.jwt.secure_cookie)
        .same_site(SameSite::Strict)
        .build()
}

fn cleared_cookie(principal: Principal) -> Cookie<'static> {
    Cookie::build(principal.cookie_name()).path("/").build()
}

/// POST /api/auth/hr/signup
pub async fn hr_signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<human_resource::Model>>)> {
    require(&req.first_name, "first_name")?;
    require(&req.last_name, "last_name")?;
    require(&req.contact_number, "contact_number")?;
    require(&req.organization_name, "organization_name")?;
    check_password_strength(&req.password)?;
    let email = normalize_email(&req.email)?;

    ensure_email_free(state.db.as_ref(), &email).await?;

    let password = hash_password(&req.password)?;
    let (token, token_hash) = one_time_token();
    let now = Utc::now();

    let txn = state.db.begin().await?;
    let org = organization::ActiveModel {
        name: Set(req.organization_name.trim().to_string()),
        description: Set(req.organization_description),
        olink: Set(req.organization_olink),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let hr = human_resource::ActiveModel {
        organization_id: Set(org.id),
        first_name: Set(req.first_name.trim().to_string()),
        last_name: Set(req.last_name.trim().to_string()),
        email: Set(email.clone()),
        password: Set(password),
        contact_number: Set(req.contact_number.trim().to_string()),
        department_id: Set(None),
        is_verified: Set(false),
        verification_token_hash: Set(Some(token_hash)),
        verification_expires_at: Set(Some(now + Duration::hours(VERIFY_TOKEN_HOURS))),
        reset_token_hash: Set(None),
        reset_expires_at: Set(None),
        last_login: Set(Some(now)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    state.send_mail(templates::verification(
        &hr.email,
        &hr.first_name,
        &state.config.client_url,
        &token,
    ));

    let session = issue_token(&state.config.jwt, Principal::Hr, hr.id, org.id)?;
    tracing::info!("Organization {} created by HR-Admin {}", org.name, hr.email);

    Ok((
        jar.add(session_cookie(&state, Principal::Hr, session)),
        Json(ApiResponse::success(hr)),
    ))
}

/// POST /api/auth/hr/login
pub async fn hr_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<human_resource::Model>>)> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("email and password are required".to_string()));
    }
    let email = req.email.trim().to_lowercase();

    let hr = human_resource::Entity::find()
        .filter(human_resource::Column::Email.eq(email.as_str()))
        .one(state.db.as_ref())
        .await?;

    let Some(hr) = hr.filter(|hr| verify_password(&req.password, &hr.password)) else {
        tracing::warn!("HR login failed: {}", email);
        return Err(AppError::BadRequest("invalid email or password".to_string()));
    };

    let session = issue_token(&state.config.jwt, Principal::Hr, hr.id, hr.organization_id)?;

    let mut active = hr.into_active_model();
    active.last_login = Set(Some(Utc::now()));
    let hr = active.update(state.db.as_ref()).await?;

    tracing::info!("HR-Admin logged in: {}", hr.email);
    Ok((
        jar.add(session_cookie(&state, Principal::Hr, session)),
        Json(ApiResponse::success(hr)),
    ))
}

/// POST /api/auth/employee/login
pub async fn employee_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<employee::Model>>)> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("email and password are required".to_string()));
    }
    let email = req.email.trim().to_lowercase();

    let emp = employee::Entity::find()
        .filter(employee::Column::Email.eq(email.as_str()))
        .one(state.db.as_ref())
        .await?;

    let Some(emp) = emp.filter(|e| verify_password(&req.password, &e.password)) else {
        tracing::warn!("Employee login failed: {}", email);
        return Err(AppError::BadRequest("invalid email or password".to_string()));
    };

    if !emp.is_active() {
        tracing::warn!("Login refused for inactive employee: {}", email);
        return Err(AppError::Forbidden("account is inactive".to_string()));
    }

    let session = issue_token(&state.config.jwt, Principal::Employee, emp.id, emp.organization_id)?;

    let mut active = emp.into_active_model();
    active.last_login = Set(Some(Utc::now()));
    let emp = active.update(state.db.as_ref()).await?;

    tracing::info!("Employee logged in: {}", emp.email);
    Ok((
        jar.add(session_cookie(&state, Principal::Employee, session)),
        Json(ApiResponse::success(emp)),
    ))
}

/// POST /api/auth/hr/logout
pub async fn hr_logout(jar: CookieJar) -> (CookieJar, Json<ApiResponse<()>>) {
    (
        jar.remove(cleared_cookie(Principal::Hr)),
        Json(ApiResponse::success_msg("logout success")),
    )
}

/// POST /api/auth/employee/logout
pub async fn employee_logout(jar: CookieJar) -> (CookieJar, Json<ApiResponse<()>>) {
    (
        jar.remove(cleared_cookie(Principal::Employee)),
        Json(ApiResponse::success_msg("logout success")),
    )
}

/// GET /api/auth/hr/check
pub async fn hr_check(Extension(user): Extension<CurrentUser>) -> AppResult<Json<ApiResponse<SessionInfo>>> {
    if !user.is_hr() {
        return Err(AppError::Forbidden("not an HR-Admin session".to_string()));
    }
    Ok(Json(ApiResponse::success(user.into())))
}

/// GET /api/auth/employee/check
pub async fn employee_check(
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<SessionInfo>>> {
    if user.is_hr() {
        return Err(AppError::Forbidden("not an employee session".to_string()));
    }
    Ok(Json(ApiResponse::success(user.into())))
}

/// POST /api/auth/hr/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    require(&req.token, "token")?;
    let now = Utc::now();

    let hr = human_resource::Entity::find()
        .filter(human_resource::Column::VerificationTokenHash.eq(hash_token(req.token.trim())))
        .filter(human_resource::Column::VerificationExpiresAt.gt(now))
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::BadRequest("invalid or expired verification token".to_string()))?;

    let org_name = organization::Entity::find_by_id(hr.organization_id)
        .one(state.db.as_ref())
        .await?
        .map(|o| o.name)
        .unwrap_or_default();

    let mut active = hr.into_active_model();
    active.is_verified = Set(true);
    active.verification_token_hash = Set(None);
    active.verification_expires_at = Set(None);
    active.updated_at = Set(now);
    let hr = active.update(state.db.as_ref()).await?;

    state.send_mail(templates::welcome(&hr.email, &hr.first_name, &org_name));
    tracing::info!("HR-Admin verified email: {}", hr.email);

    Ok(Json(ApiResponse::success_msg("email verified")))
}

/// POST /api/auth/hr/resend-verify-email
pub async fn resend_verify_email(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<()>>> {
    if !user.is_hr() {
        return Err(AppError::Forbidden("not an HR-Admin session".to_string()));
    }
    let hr = human_resource::Entity::find_by_id(user.id)
        .one(state.db.as_ref())
        .await?
        .ok_or(AppError::Unauthorized)?;

    if hr.is_verified {
        return Err(AppError::BadRequest("email is already verified".to_string()));
    }

    let (token, token_hash) = one_time_token();
    let now = Utc::now();
    let mut active = hr.into_active_model();
    active.verification_token_hash = Set(Some(token_hash));
    active.verification_expires_at = Set(Some(now + Duration::hours(VERIFY_TOKEN_HOURS)));
    active.updated_at = Set(now);
    let hr = active.update(state.db.as_ref()).await?;

    state.send_mail(templates::verification(
        &hr.email,
        &hr.first_name,
        &state.config.client_url,
        &token,
    ));

    Ok(Json(ApiResponse::success_msg("verification email sent")))
}

const FORGOT_REPLY: &str = "if the account exists, a reset link has been sent";

/// POST /api/auth/hr/forgot-password
pub async fn hr_forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let email = req.email.trim().to_lowercase();
    let hr = human_resource::Entity::find()
        .filter(human_resource::Column::Email.eq(email.as_str()))
        .one(state.db.as_ref())
        .await?;

    if let Some(hr) = hr {
        let (token, token_hash) = one_time_token();
        let now = Utc::now();
        let mut active = hr.into_active_model();
        active.reset_token_hash = Set(Some(token_hash));
        active.reset_expires_at = Set(Some(now + Duration::hours(RESET_TOKEN_HOURS)));
        active.updated_at = Set(now);
        active.update(state.db.as_ref()).await?;

        state.send_mail(templates::password_reset(
            &email,
            &state.config.client_url,
            HR_RESET_PATH,
            &token,
        ));
        tracing::info!("Password reset requested for HR-Admin {}", email);
    }

    Ok(Json(ApiResponse::success_msg(FORGOT_REPLY)))
}

/// POST /api/auth/employee/forgot-password
pub async fn employee_forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let email = req.email.trim().to_lowercase();
    let emp = employee::Entity::find()
        .filter(employee::Column::Email.eq(email.as_str()))
        .one(state.db.as_ref())
        .await?;

    if let Some(emp) = emp.filter(|e| e.is_active()) {
        let (token, token_hash) = one_time_token();
        let now = Utc::now();
        let mut active = emp.into_active_model();
        active.reset_token_hash = Set(Some(token_hash));
        active.reset_expires_at = Set(Some(now + Duration::hours(RESET_TOKEN_HOURS)));
        active.updated_at = Set(now);
        active.update(state.db.as_ref()).await?;

        state.send_mail(templates::password_reset(
            &email,
            &state.config.client_url,
            EMPLOYEE_RESET_PATH,
            &token,
        ));
        tracing::info!("Password reset requested for employee {}", email);
    }

    Ok(Json(ApiResponse::success_msg(FORGOT_REPLY)))
}

/// POST /api/auth/hr/reset-password/:token
pub async fn hr_reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    check_password_strength(&req.password)?;
    let now = Utc::now();

    let hr = human_resource::Entity::find()
        .filter(human_resource::Column::ResetTokenHash.eq(hash_token(&token)))
        .filter(human_resource::Column::ResetExpiresAt.gt(now))
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::BadRequest("invalid or expired reset token".to_string()))?;

    let mut active = hr.into_active_model();
    active.password = Set(hash_password(&req.password)?);
    active.reset_token_hash = Set(None);
    active.reset_expires_at = Set(None);
    active.updated_at = Set(now);
    let hr = active.update(state.db.as_ref()).await?;

    tracing::info!("Password reset completed for HR-Admin {}", hr.email);
    Ok(Json(ApiResponse::success_msg("password updated")))
}

/// POST /api/auth/employee/reset-password/:token
pub async fn employee_reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    check_password_strength(&req.password)?;
    let now = Utc::now();

    let emp = employee::Entity::find()
        .filter(employee::Column::ResetTokenHash.eq(hash_token(&token)))
        .filter(employee::Column::ResetExpiresAt.gt(now))
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::BadRequest("invalid or expired reset token".to_string()))?;

    let mut active = emp.into_active_model();
    active.password = Set(hash_password(&req.password)?);
    active.reset_token_hash = Set(None);
    active.reset_expires_at = Set(None);
    active.updated_at = Set(now);
    let emp = active.update(state.db.as_ref()).await?;

    tracing::info!("Password reset completed for employee {}", emp.email);
    Ok(Json(ApiResponse::success_msg("password updated")))
}

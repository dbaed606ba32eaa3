//! Authentication middleware
//!
//! Resolves the `HRtoken` / `EMtoken` session cookie into a [`CurrentUser`]
//! for every non-public API route.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use sea_orm::EntityTrait;

use crate::auth::{decode_token, Claims};
use crate::entity::notification_view::Principal;
use crate::entity::{employee, human_resource};
use crate::error::{AppError, AppResult};
use crate::permission::role;
use crate::state::AppState;

/// Extension to store current user in request
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i64,
    pub principal: Principal,
    pub organization_id: i64,
    /// `HR-Admin`, `Manager` or `Employee`
    pub role: String,
    pub name: String,
    pub email: String,
    pub department_id: Option<i64>,
    /// Permissions resolved from Casbin for `role`
    pub permissions: Vec<String>,
}

impl CurrentUser {
    /// Check if the user has a specific permission
    pub fn has_permission(&self, perm: &str) -> bool {
        self.permissions.iter().any(|p| p == perm)
    }

    /// Fail with 403 unless the user has `perm`
    pub fn require(&self, perm: &str) -> AppResult<()> {
        if self.has_permission(perm) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = self.id,
                role = %self.role,
                "Permission denied: {}",
                perm
            );
            Err(AppError::Forbidden(format!("{} role cannot access this resource", self.role)))
        }
    }

    pub fn is_hr(&self) -> bool {
        self.principal == Principal::Hr
    }

    pub fn is_manager(&self) -> bool {
        self.role == role::MANAGER
    }
}

/// Paths that don't require authentication
fn is_public_path(path: &str) -> bool {
    if !path.starts_with("/api") {
        return true;
    }
    if path == "/api/health" {
        return true;
    }
    matches!(
        path,
        "/api/auth/hr/signup"
            | "/api/auth/hr/login"
            | "/api/auth/hr/logout"
            | "/api/auth/hr/verify-email"
            | "/api/auth/hr/forgot-password"
            | "/api/auth/employee/login"
            | "/api/auth/employee/logout"
            | "/api/auth/employee/forgot-password"
    ) || path.starts_with("/api/auth/hr/reset-password/")
        || path.starts_with("/api/auth/employee/reset-password/")
}

/// Which session to try first when a browser holds both cookies.
/// Employee self-service and manager routes prefer the employee session.
pub fn preferred_principal(path: &str) -> Principal {
    let employee_side = path.starts_with("/api/auth/employee")
        || path.starts_with("/api/manager")
        || path.starts_with("/api/tasks")
        || path.ends_with("/me")
        || path.contains("/me/");
    if employee_side {
        Principal::Employee
    } else {
        Principal::Hr
    }
}

/// Decode the session stored in the principal's own cookie. A token found in
/// the other principal's cookie is rejected.
fn session_claims(state: &AppState, jar: &CookieJar, principal: Principal) -> Option<Claims> {
    let cookie = jar.get(principal.cookie_name())?;
    let claims = decode_token(&state.config.jwt, cookie.value()).ok()?;
    (claims.principal == principal).then_some(claims)
}

async fn load_user(state: &AppState, claims: &Claims) -> AppResult<CurrentUser> {
    let (id, organization_id, role, name, email, department_id) = match claims.principal {
        Principal::Hr => {
            let hr = human_resource::Entity::find_by_id(claims.sub)
                .one(state.db.as_ref())
                .await?
                .ok_or(AppError::Unauthorized)?;
            (
                hr.id,
                hr.organization_id,
                role::HR_ADMIN.to_string(),
                hr.full_name(),
                hr.email,
                hr.department_id,
            )
        }
        Principal::Employee => {
            let emp = employee::Entity::find_by_id(claims.sub)
                .one(state.db.as_ref())
                .await?
                .ok_or(AppError::Unauthorized)?;
            if !emp.is_active() {
                tracing::warn!("Session of inactive employee rejected: {}", emp.email);
                return Err(AppError::Unauthorized);
            }
            let role = if emp.is_manager() { role::MANAGER } else { role::EMPLOYEE };
            let name = emp.full_name();
            (
                emp.id,
                emp.organization_id,
                role.to_string(),
                name,
                emp.email,
                emp.department_id,
            )
        }
    };

    if organization_id != claims.org {
        return Err(AppError::Unauthorized);
    }

    let permissions = state.perm.get_role_permissions(&role).await;

    Ok(CurrentUser {
        id,
        principal: claims.principal,
        organization_id,
        role,
        name,
        email,
        department_id,
        permissions,
    })
}

/// Authentication middleware
pub async fn auth_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if is_public_path(&path) {
        return next.run(request).await;
    }

    let first = preferred_principal(&path);
    let second = match first {
        Principal::Hr => Principal::Employee,
        Principal::Employee => Principal::Hr,
    };
    let claims = session_claims(&state, &jar, first).or_else(|| session_claims(&state, &jar, second));

    let Some(claims) = claims else {
        return AppError::Unauthorized.into_response();
    };

    match load_user(&state, &claims).await {
        Ok(current_user) => {
            request.extensions_mut().insert(current_user);
            next.run(request).await
        }
        Err(AppError::Unauthorized) => {
            tracing::warn!("Session refers to unknown account {:?} #{}", claims.principal, claims.sub);
            AppError::Unauthorized.into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths() {
        assert!(is_public_path("/api/health"));
        assert!(is_public_path("/api/auth/hr/login"));
        assert!(is_public_path("/api/auth/employee/reset-password/abc"));
        assert!(is_public_path("/index.html"));
        assert!(!is_public_path("/api/auth/hr/check"));
        assert!(!is_public_path("/api/employees"));
        assert!(!is_public_path("/api/auth/hr/resend-verify-email"));
    }

    #[test]
    fn cookie_preference_by_route() {
        assert_eq!(preferred_principal("/api/employees"), Principal::Hr);
        assert_eq!(preferred_principal("/api/employees/me"), Principal::Employee);
        assert_eq!(preferred_principal("/api/attendance/me/check-in"), Principal::Employee);
        assert_eq!(preferred_principal("/api/manager/tasks"), Principal::Employee);
        assert_eq!(preferred_principal("/api/auth/employee/check"), Principal::Employee);
        assert_eq!(preferred_principal("/api/leaves"), Principal::Hr);
    }

    fn user(role_name: &str, permissions: &[&str]) -> CurrentUser {
        CurrentUser {
            id: 1,
            principal: Principal::Employee,
            organization_id: 1,
            role: role_name.to_string(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            department_id: None,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn require_maps_to_forbidden() {
        use crate::permission::perm;
        let u = user(role::EMPLOYEE, &[perm::LEAVES_SELF]);
        assert!(u.require(perm::LEAVES_SELF).is_ok());
        assert!(matches!(u.require(perm::LEAVES_DECIDE), Err(AppError::Forbidden(_))));
        assert!(!u.is_manager());
        assert!(user(role::MANAGER, &[]).is_manager());
    }
}

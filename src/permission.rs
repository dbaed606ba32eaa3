//! Permission module using Casbin
//!
//! Role-based access control over the three account roles. The model and the
//! role policies are compiled in; each request's role is resolved to its
//! permission list once, in the auth middleware.

use casbin::{CoreApi, DefaultModel, Enforcer, MgmtApi};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Role names as issued to principals
pub mod role {
    pub const HR_ADMIN: &str = "HR-Admin";
    pub const MANAGER: &str = "Manager";
    pub const EMPLOYEE: &str = "Employee";
}

/// Permission constants, `resource:action`
pub mod perm {
    // HR-Admin
    pub const HR_MANAGE: &str = "hr:manage";
    pub const EMPLOYEES_MANAGE: &str = "employees:manage";
    pub const DEPARTMENTS_MANAGE: &str = "departments:manage";
    pub const ATTENDANCE_MANAGE: &str = "attendance:manage";
    pub const LEAVES_DECIDE: &str = "leaves:decide";
    pub const REQUESTS_DECIDE: &str = "requests:decide";
    pub const SALARIES_MANAGE: &str = "salaries:manage";
    pub const NOTICES_MANAGE: &str = "notices:manage";
    pub const INTERVIEWS_MANAGE: &str = "interviews:manage";
    pub const BALANCES_MANAGE: &str = "balances:manage";
    pub const DASHBOARD_ORG: &str = "dashboard:org";

    // Employee (and, by inheritance, Manager)
    pub const PROFILE_SELF: &str = "profile:self";
    pub const ATTENDANCE_SELF: &str = "attendance:self";
    pub const LEAVES_SELF: &str = "leaves:self";
    pub const REQUESTS_SELF: &str = "requests:self";
    pub const SALARIES_SELF: &str = "salaries:self";
    pub const NOTICES_SELF: &str = "notices:self";
    pub const TASKS_SELF: &str = "tasks:self";
    pub const DASHBOARD_SELF: &str = "dashboard:self";

    // Manager
    pub const TEAM_MANAGE: &str = "team:manage";
    pub const TASKS_MANAGE: &str = "tasks:manage";
    pub const REVIEWS_MANAGE: &str = "reviews:manage";

    /// All permissions
    pub const ALL: [&str; 22] = [
        HR_MANAGE,
        EMPLOYEES_MANAGE,
        DEPARTMENTS_MANAGE,
        ATTENDANCE_MANAGE,
        LEAVES_DECIDE,
        REQUESTS_DECIDE,
        SALARIES_MANAGE,
        NOTICES_MANAGE,
        INTERVIEWS_MANAGE,
        BALANCES_MANAGE,
        DASHBOARD_ORG,
        PROFILE_SELF,
        ATTENDANCE_SELF,
        LEAVES_SELF,
        REQUESTS_SELF,
        SALARIES_SELF,
        NOTICES_SELF,
        TASKS_SELF,
        DASHBOARD_SELF,
        TEAM_MANAGE,
        TASKS_MANAGE,
        REVIEWS_MANAGE,
    ];
}

const MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act
"#;

/// Role policies: (role, permission)
const POLICIES: &[(&str, &str)] = &[
    (role::HR_ADMIN, perm::HR_MANAGE),
    (role::HR_ADMIN, perm::EMPLOYEES_MANAGE),
    (role::HR_ADMIN, perm::DEPARTMENTS_MANAGE),
    (role::HR_ADMIN, perm::ATTENDANCE_MANAGE),
    (role::HR_ADMIN, perm::LEAVES_DECIDE),
    (role::HR_ADMIN, perm::REQUESTS_DECIDE),
    (role::HR_ADMIN, perm::SALARIES_MANAGE),
    (role::HR_ADMIN, perm::NOTICES_MANAGE),
    (role::HR_ADMIN, perm::INTERVIEWS_MANAGE),
    (role::HR_ADMIN, perm::BALANCES_MANAGE),
    (role::HR_ADMIN, perm::DASHBOARD_ORG),
    (role::EMPLOYEE, perm::PROFILE_SELF),
    (role::EMPLOYEE, perm::ATTENDANCE_SELF),
    (role::EMPLOYEE, perm::LEAVES_SELF),
    (role::EMPLOYEE, perm::REQUESTS_SELF),
    (role::EMPLOYEE, perm::SALARIES_SELF),
    (role::EMPLOYEE, perm::NOTICES_SELF),
    (role::EMPLOYEE, perm::TASKS_SELF),
    (role::EMPLOYEE, perm::DASHBOARD_SELF),
    (role::MANAGER, perm::TEAM_MANAGE),
    (role::MANAGER, perm::TASKS_MANAGE),
    (role::MANAGER, perm::REVIEWS_MANAGE),
];

/// Role inheritance: (role, inherited role)
const GROUPINGS: &[(&str, &str)] = &[(role::MANAGER, role::EMPLOYEE)];

fn split(permission: &str) -> (&str, &str) {
    permission.split_once(':').unwrap_or((permission, ""))
}

/// Permission enforcer wrapper
#[derive(Clone)]
pub struct PermissionEnforcer {
    enforcer: Arc<RwLock<Enforcer>>,
}

impl PermissionEnforcer {
    /// Build the enforcer with the compiled-in model and role policies
    pub async fn new() -> anyhow::Result<Self> {
        let model = DefaultModel::from_str(MODEL).await?;
        let mut enforcer = Enforcer::new(model, ()).await?;

        for (role, permission) in POLICIES {
            let (obj, act) = split(permission);
            enforcer
                .add_policy(vec![role.to_string(), obj.to_string(), act.to_string()])
                .await?;
        }
        for (role, parent) in GROUPINGS {
            enforcer
                .add_grouping_policy(vec![role.to_string(), parent.to_string()])
                .await?;
        }

        Ok(Self {
            enforcer: Arc::new(RwLock::new(enforcer)),
        })
    }

    /// Check if a role holds a `resource:action` permission
    pub async fn check(&self, role: &str, permission: &str) -> bool {
        let (obj, act) = split(permission);
        let enforcer = self.enforcer.read().await;
        enforcer.enforce((role, obj, act)).unwrap_or(false)
    }

    /// Get all permissions granted to a role, inherited ones included
    pub async fn get_role_permissions(&self, role: &str) -> Vec<String> {
        let enforcer = self.enforcer.read().await;
        let mut permissions = Vec::new();

        for permission in perm::ALL {
            let (obj, act) = split(permission);
            if enforcer.enforce((role, obj, act)).unwrap_or(false) {
                permissions.push(permission.to_string());
            }
        }

        permissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hr_admin_manages_but_has_no_self_service() {
        let enforcer = PermissionEnforcer::new().await.unwrap();
        assert!(enforcer.check(role::HR_ADMIN, perm::EMPLOYEES_MANAGE).await);
        assert!(enforcer.check(role::HR_ADMIN, perm::LEAVES_DECIDE).await);
        assert!(!enforcer.check(role::HR_ADMIN, perm::ATTENDANCE_SELF).await);
        assert!(!enforcer.check(role::HR_ADMIN, perm::TASKS_MANAGE).await);
    }

    #[tokio::test]
    async fn manager_inherits_employee_permissions() {
        let enforcer = PermissionEnforcer::new().await.unwrap();
        assert!(enforcer.check(role::MANAGER, perm::REVIEWS_MANAGE).await);
        assert!(enforcer.check(role::MANAGER, perm::LEAVES_SELF).await);
        assert!(!enforcer.check(role::MANAGER, perm::LEAVES_DECIDE).await);
    }

    #[tokio::test]
    async fn employee_cannot_reach_manager_or_hr_routes() {
        let enforcer = PermissionEnforcer::new().await.unwrap();
        let perms = enforcer.get_role_permissions(role::EMPLOYEE).await;
        assert!(perms.contains(&perm::TASKS_SELF.to_string()));
        assert!(!perms.contains(&perm::TASKS_MANAGE.to_string()));
        assert!(!perms.contains(&perm::SALARIES_MANAGE.to_string()));
        assert_eq!(perms.len(), 8);
    }

    #[tokio::test]
    async fn unknown_role_has_nothing() {
        let enforcer = PermissionEnforcer::new().await.unwrap();
        assert!(enforcer.get_role_permissions("Intern").await.is_empty());
    }
}

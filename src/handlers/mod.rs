//! Request handlers module

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Deserialize;

use crate::entity::{
    department as department_entity, employee as employee_entity, human_resource,
};
use crate::error::{AppError, AppResult, OptionExt};

pub mod attendance;
pub mod auth;
pub mod balance;
pub mod dashboard;
pub mod department;
pub mod employee;
pub mod hr;
pub mod interview;
pub mod leave;
pub mod manager;
pub mod notice;
pub mod notification;
pub mod request;
pub mod salary;
pub mod task;

/// Query parameters for list pagination
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

pub(crate) fn default_page() -> u64 {
    1
}

pub(crate) fn default_page_size() -> u64 {
    20
}

/// Zero-based page index and a page size clamped to 1..=100
pub fn page_bounds(page: u64, page_size: u64) -> (u64, u64) {
    (page.max(1) - 1, page_size.clamp(1, 100))
}

impl PageQuery {
    pub fn bounds(&self) -> (u64, u64) {
        page_bounds(self.page, self.page_size)
    }
}

/// Employee of the caller's organization, or 404.
pub(crate) async fn find_employee<C: ConnectionTrait>(
    db: &C,
    organization_id: i64,
    id: i64,
) -> AppResult<employee_entity::Model> {
    employee_entity::Entity::find_by_id(id)
        .filter(employee_entity::Column::OrganizationId.eq(organization_id))
        .one(db)
        .await?
        .ok_or_not_found(format!("Employee {} not found", id))
}

/// Department of the caller's organization, or 404.
pub(crate) async fn find_department<C: ConnectionTrait>(
    db: &C,
    organization_id: i64,
    id: i64,
) -> AppResult<department_entity::Model> {
    department_entity::Entity::find_by_id(id)
        .filter(department_entity::Column::OrganizationId.eq(organization_id))
        .one(db)
        .await?
        .ok_or_not_found(format!("Department {} not found", id))
}

/// Emails are unique across HR-Admin and employee accounts.
pub(crate) async fn ensure_email_free<C: ConnectionTrait>(db: &C, email: &str) -> AppResult<()> {
    let hr = human_resource::Entity::find()
        .filter(human_resource::Column::Email.eq(email))
        .count(db)
        .await?;
    let emp = employee_entity::Entity::find()
        .filter(employee_entity::Column::Email.eq(email))
        .count(db)
        .await?;
    if hr + emp > 0 {
        return Err(AppError::Conflict(format!("{} is already registered", email)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_are_clamped() {
        let q = PageQuery { page: 0, page_size: 1000 };
        assert_eq!(q.bounds(), (0, 100));
        let q = PageQuery { page: 3, page_size: 10 };
        assert_eq!(q.bounds(), (2, 10));
    }
}

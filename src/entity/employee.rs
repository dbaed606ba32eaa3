//! Employee entity
//!
//! Table: hr_employee. Employees are never physically deleted; removal flips
//! `status` to `Inactive`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Employee role
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum EmployeeRole {
    #[sea_orm(string_value = "Employee")]
    Employee,
    #[sea_orm(string_value = "Manager")]
    Manager,
}

/// Employment status
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum EmployeeStatus {
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Inactive")]
    Inactive,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_employee")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub organization_id: i64,

    #[sea_orm(column_type = "String(Some(64))")]
    pub first_name: String,

    #[sea_orm(column_type = "String(Some(64))")]
    pub last_name: String,

    #[sea_orm(column_type = "String(Some(128))", unique)]
    pub email: String,

    /// bcrypt hash
    #[sea_orm(column_type = "String(Some(128))")]
    #[serde(skip_serializing)]
    pub password: String,

    #[sea_orm(column_type = "String(Some(20))")]
    pub contact_number: String,

    pub role: EmployeeRole,

    pub status: EmployeeStatus,

    #[sea_orm(nullable)]
    pub department_id: Option<i64>,

    pub is_verified: bool,

    #[sea_orm(column_type = "String(Some(64))", nullable)]
    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,

    #[sea_orm(nullable)]
    #[serde(skip_serializing)]
    pub reset_expires_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub last_login: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }

    pub fn is_manager(&self) -> bool {
        self.role == EmployeeRole::Manager
    }
}

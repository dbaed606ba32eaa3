//! HumanResources entity - HR-Admin accounts
//!
//! Table: hr_human_resource

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_human_resource")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub organization_id: i64,

    #[sea_orm(column_type = "String(Some(64))")]
    pub first_name: String,

    #[sea_orm(column_type = "String(Some(64))")]
    pub last_name: String,

    /// Login email, unique across HR-Admins (and checked against employees)
    #[sea_orm(column_type = "String(Some(128))", unique)]
    pub email: String,

    /// bcrypt hash
    #[sea_orm(column_type = "String(Some(128))")]
    #[serde(skip_serializing)]
    pub password: String,

    #[sea_orm(column_type = "String(Some(20))")]
    pub contact_number: String,

    #[sea_orm(nullable)]
    pub department_id: Option<i64>,

    pub is_verified: bool,

    /// SHA-256 of the emailed verification token
    #[sea_orm(column_type = "String(Some(64))", nullable)]
    #[serde(skip_serializing)]
    pub verification_token_hash: Option<String>,

    #[sea_orm(nullable)]
    #[serde(skip_serializing)]
    pub verification_expires_at: Option<DateTimeUtc>,

    /// SHA-256 of the emailed password reset token
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
}

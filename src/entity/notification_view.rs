//! NotificationView entity - per-user last-viewed timestamps
//!
//! Table: hr_notification_view. One row per (principal, user_id).

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which account table `user_id` points into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(8))")]
#[serde(rename_all = "lowercase")]
pub enum Principal {
    #[sea_orm(string_value = "hr")]
    Hr,
    #[sea_orm(string_value = "employee")]
    Employee,
}

/// Section of the client with its own unread counter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Notices,
    Leaves,
    Requests,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_notification_view")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub principal: Principal,

    pub user_id: i64,

    pub notices_viewed_at: DateTimeUtc,
    pub leaves_viewed_at: DateTimeUtc,
    pub requests_viewed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn viewed_at(&self, section: Section) -> DateTime<Utc> {
        match section {
            Section::Notices => self.notices_viewed_at,
            Section::Leaves => self.leaves_viewed_at,
            Section::Requests => self.requests_viewed_at,
        }
    }
}

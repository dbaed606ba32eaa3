//! GenerateRequest entity - employee requisitions
//!
//! Table: hr_generate_request

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum RequestStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Approved")]
    Approved,
    #[sea_orm(string_value = "Denied")]
    Denied,
}

impl RequestStatus {
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        self == RequestStatus::Pending && next != RequestStatus::Pending
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_generate_request")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub organization_id: i64,

    pub employee_id: i64,

    /// Department of the requester at filing time
    #[sea_orm(nullable)]
    pub department_id: Option<i64>,

    #[sea_orm(column_type = "String(Some(128))")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub status: RequestStatus,

    #[sea_orm(nullable)]
    pub approved_by: Option<i64>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decided_requests_are_final() {
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Denied));
        assert!(!RequestStatus::Denied.can_transition_to(RequestStatus::Approved));
        assert!(!RequestStatus::Approved.can_transition_to(RequestStatus::Pending));
    }
}

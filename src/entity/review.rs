//! Review entity - manager-authored scores
//!
//! Table: hr_review

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 5;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_review")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub organization_id: i64,

    pub employee_id: i64,

    pub manager_id: i64,

    /// 1..=5
    pub score: i32,

    #[sea_orm(column_type = "Text")]
    pub comment: String,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub fn is_valid_score(score: i32) -> bool {
    (MIN_SCORE..=MAX_SCORE).contains(&score)
}

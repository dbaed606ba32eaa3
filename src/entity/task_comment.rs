//! TaskComment entity
//!
//! Table: hr_task_comment

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_task_comment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub task_id: i64,

    /// Employee id of the author (assignee or manager)
    pub author_id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub author_name: String,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

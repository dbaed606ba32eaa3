//! Interviewinsight entity - scheduled candidate interviews
//!
//! Table: hr_interview_insight

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum InterviewStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Scheduled")]
    Scheduled,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_interview_insight")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub organization_id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub applicant_name: String,

    #[sea_orm(column_type = "String(Some(128))")]
    pub applicant_email: String,

    #[sea_orm(column_type = "String(Some(128))")]
    pub position: String,

    /// HR-Admin conducting the interview
    pub interviewer_id: i64,

    pub interview_date: DateTimeUtc,

    pub status: InterviewStatus,

    #[sea_orm(column_type = "Text")]
    pub feedback: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Task entity - work items a manager assigns to team members
//!
//! Table: hr_task. Comments live in `task_comment`.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum TaskStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[serde(rename = "In Progress")]
    #[sea_orm(string_value = "In Progress")]
    InProgress,
    #[sea_orm(string_value = "Completed")]
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(8))")]
pub enum TaskPriority {
    #[sea_orm(string_value = "Low")]
    Low,
    #[sea_orm(string_value = "Medium")]
    Medium,
    #[sea_orm(string_value = "High")]
    High,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_task")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub organization_id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Employee doing the work
    pub assigned_to: i64,

    /// Manager that created the task
    pub assigned_by: i64,

    pub deadline: DateTimeUtc,

    pub priority: TaskPriority,

    pub status: TaskStatus,

    #[sea_orm(nullable)]
    pub completed_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// How a task stands against its deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeadlineOutcome {
    OnTime,
    Late,
    /// Still open and the deadline has not passed
    Undecided,
}

impl Model {
    pub fn deadline_outcome(&self, now: DateTime<Utc>) -> DeadlineOutcome {
        match (self.status, self.completed_at) {
            (TaskStatus::Completed, Some(done)) if done <= self.deadline => DeadlineOutcome::OnTime,
            (TaskStatus::Completed, _) => DeadlineOutcome::Late,
            _ if now > self.deadline => DeadlineOutcome::Late,
            _ => DeadlineOutcome::Undecided,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn task(status: TaskStatus, deadline: DateTime<Utc>, completed_at: Option<DateTime<Utc>>) -> Model {
        Model {
            id: 1,
            organization_id: 1,
            title: "Quarterly report".into(),
            description: String::new(),
            assigned_to: 2,
            assigned_by: 3,
            deadline,
            priority: TaskPriority::Medium,
            status,
            completed_at,
            created_at: deadline - Duration::days(7),
            updated_at: deadline - Duration::days(7),
        }
    }

    #[test]
    fn deadline_outcomes() {
        let deadline = Utc.with_ymd_and_hms(2024, 6, 1, 17, 0, 0).unwrap();
        let before = deadline - Duration::hours(1);
        let after = deadline + Duration::hours(1);

        assert_eq!(
            task(TaskStatus::Completed, deadline, Some(before)).deadline_outcome(after),
            DeadlineOutcome::OnTime
        );
        assert_eq!(
            task(TaskStatus::Completed, deadline, Some(after)).deadline_outcome(after),
            DeadlineOutcome::Late
        );
        assert_eq!(
            task(TaskStatus::InProgress, deadline, None).deadline_outcome(before),
            DeadlineOutcome::Undecided
        );
        assert_eq!(
            task(TaskStatus::Pending, deadline, None).deadline_outcome(after),
            DeadlineOutcome::Late
        );
    }
}

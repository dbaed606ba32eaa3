//! Notice entity - announcements published by HR
//!
//! Table: hr_notice

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(24))")]
pub enum NoticeAudience {
    #[sea_orm(string_value = "All")]
    All,
    #[serde(rename = "Department-Specific")]
    #[sea_orm(string_value = "Department-Specific")]
    Department,
    #[serde(rename = "Employee-Specific")]
    #[sea_orm(string_value = "Employee-Specific")]
    Employee,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_notice")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub organization_id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub audience: NoticeAudience,

    /// Target department when audience is `Department-Specific`
    #[sea_orm(nullable)]
    pub department_id: Option<i64>,

    /// Target employee when audience is `Employee-Specific`
    #[sea_orm(nullable)]
    pub employee_id: Option<i64>,

    /// HR-Admin that published the notice
    pub created_by: i64,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether an employee with the given id and department receives this notice.
    pub fn is_addressed_to(&self, employee_id: i64, department_id: Option<i64>) -> bool {
        match self.audience {
            NoticeAudience::All => true,
            NoticeAudience::Department => {
                department_id.is_some() && self.department_id == department_id
            }
            NoticeAudience::Employee => self.employee_id == Some(employee_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notice(audience: NoticeAudience, department_id: Option<i64>, employee_id: Option<i64>) -> Model {
        Model {
            id: 1,
            organization_id: 1,
            title: "Office closed".into(),
            content: "Friday".into(),
            audience,
            department_id,
            employee_id,
            created_by: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn audience_targeting() {
        assert!(notice(NoticeAudience::All, None, None).is_addressed_to(7, None));

        let dept = notice(NoticeAudience::Department, Some(3), None);
        assert!(dept.is_addressed_to(7, Some(3)));
        assert!(!dept.is_addressed_to(7, Some(4)));
        assert!(!dept.is_addressed_to(7, None));

        let direct = notice(NoticeAudience::Employee, None, Some(7));
        assert!(direct.is_addressed_to(7, Some(3)));
        assert!(!direct.is_addressed_to(8, Some(3)));
    }
}

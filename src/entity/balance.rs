//! Balance entity - corporate balance ledger
//!
//! Table: hr_balance. Amounts are minor currency units.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_balance")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub organization_id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub available_amount: i64,

    pub total_expenses: i64,

    /// Month the expenses belong to, "YYYY-MM"
    #[sea_orm(column_type = "String(Some(7))")]
    pub expense_month: String,

    /// HR-Admin that submitted the entry
    pub submitted_by: i64,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Accepts "YYYY-MM" with a month in 01..=12.
pub fn is_valid_month(value: &str) -> bool {
    let Some((year, month)) = value.split_once('-') else {
        return false;
    };
    year.len() == 4
        && month.len() == 2
        && year.chars().all(|c| c.is_ascii_digit())
        && matches!(month.parse::<u32>(), Ok(1..=12))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_format() {
        assert!(is_valid_month("2024-01"));
        assert!(is_valid_month("2024-12"));
        assert!(!is_valid_month("2024-13"));
        assert!(!is_valid_month("2024-1"));
        assert!(!is_valid_month("24-01"));
        assert!(!is_valid_month("January"));
    }
}

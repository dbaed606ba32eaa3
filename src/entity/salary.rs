//! Salary entity - payroll records
//!
//! Table: hr_salary. Amounts are minor currency units.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum SalaryStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Delayed")]
    Delayed,
    #[sea_orm(string_value = "Paid")]
    Paid,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_salary")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub organization_id: i64,

    pub employee_id: i64,

    pub basic_pay: i64,

    pub bonuses: i64,

    pub deductions: i64,

    /// basic_pay + bonuses - deductions, maintained by the server
    pub net_pay: i64,

    /// ISO 4217 code
    #[sea_orm(column_type = "String(Some(3))")]
    pub currency: String,

    pub due_date: Date,

    #[sea_orm(nullable)]
    pub payment_date: Option<Date>,

    pub status: SalaryStatus,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Net pay for the given components. `None` on overflow.
pub fn net_pay(basic_pay: i64, bonuses: i64, deductions: i64) -> Option<i64> {
    basic_pay.checked_add(bonuses)?.checked_sub(deductions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_pay_adds_bonuses_and_subtracts_deductions() {
        assert_eq!(net_pay(500_000, 25_000, 40_000), Some(485_000));
        assert_eq!(net_pay(0, 0, 0), Some(0));
        assert_eq!(net_pay(i64::MAX, 1, 0), None);
    }
}

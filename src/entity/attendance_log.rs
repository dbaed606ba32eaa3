//! AttendanceLog entity - one row per employee per day
//!
//! Table: hr_attendance_log

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How long an open check-in keeps an employee "active today"
pub const ACTIVE_WINDOW_HOURS: i64 = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "Present")]
    Present,
    #[sea_orm(string_value = "Absent")]
    Absent,
    #[serde(rename = "Not Specified")]
    #[sea_orm(string_value = "Not Specified")]
    NotSpecified,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hr_attendance_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub attendance_id: i64,

    /// UTC calendar day this entry covers
    pub log_date: Date,

    pub status: AttendanceStatus,

    #[sea_orm(nullable)]
    pub check_in: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub check_out: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// An entry makes its employee "active" when it is for today's UTC date,
    /// has a check-in younger than twelve hours and no check-out yet.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if self.log_date != now.date_naive() || self.check_out.is_some() {
            return false;
        }
        match self.check_in {
            Some(check_in) => {
                check_in <= now && now - check_in < Duration::hours(ACTIVE_WINDOW_HOURS)
            }
            None => false,
        }
    }

    /// Checked in and not yet checked out, regardless of age.
    pub fn is_open(&self) -> bool {
        self.check_in.is_some() && self.check_out.is_none()
    }
}

/// Whether any of the given entries marks the employee active at `now`.
pub fn is_active_today(logs: &[Model], now: DateTime<Utc>) -> bool {
    logs.iter().any(|log| log.is_active_at(now))
}

/// Share of days marked `Present` among days with a decided status.
/// `None` when no entry has been decided yet.
pub fn present_ratio(logs: &[Model]) -> Option<f64> {
    let decided = logs
        .iter()
        .filter(|l| l.status != AttendanceStatus::NotSpecified)
        .count();
    if decided == 0 {
        return None;
    }
    let present = logs
        .iter()
        .filter(|l| l.status == AttendanceStatus::Present)
        .count();
    Some(present as f64 / decided as f64)
}

/// Entry for a given day, if any.
pub fn log_for_day(logs: &[Model], day: NaiveDate) -> Option<&Model> {
    logs.iter().find(|l| l.log_date == day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn log(day: NaiveDate, status: AttendanceStatus, check_in: Option<DateTime<Utc>>, check_out: Option<DateTime<Utc>>) -> Model {
        Model {
            id: 1,
            attendance_id: 1,
            log_date: day,
            status,
            check_in,
            check_out,
        }
    }

    #[test]
    fn active_when_checked_in_today_and_open() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 15, 0, 0).unwrap();
        let entry = log(
            now.date_naive(),
            AttendanceStatus::Present,
            Some(now - Duration::hours(3)),
            None,
        );
        assert!(entry.is_active_at(now));
        assert!(is_active_today(&[entry], now));
    }

    #[test]
    fn inactive_after_check_out() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 15, 0, 0).unwrap();
        let entry = log(
            now.date_naive(),
            AttendanceStatus::Present,
            Some(now - Duration::hours(3)),
            Some(now - Duration::hours(1)),
        );
        assert!(!entry.is_active_at(now));
    }

    #[test]
    fn inactive_when_check_in_is_twelve_hours_old() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 23, 0, 0).unwrap();
        let entry = log(
            now.date_naive(),
            AttendanceStatus::Present,
            Some(now - Duration::hours(12)),
            None,
        );
        assert!(!entry.is_active_at(now));
    }

    #[test]
    fn inactive_for_yesterdays_entry() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 2, 0, 0).unwrap();
        let yesterday = now.date_naive().pred_opt().unwrap();
        let entry = log(
            yesterday,
            AttendanceStatus::Present,
            Some(now - Duration::hours(4)),
            None,
        );
        assert!(!entry.is_active_at(now));
        assert!(entry.is_open());
    }

    #[test]
    fn present_ratio_ignores_undecided_days() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let logs = vec![
            log(day, AttendanceStatus::Present, None, None),
            log(day, AttendanceStatus::Present, None, None),
            log(day, AttendanceStatus::Absent, None, None),
            log(day, AttendanceStatus::NotSpecified, None, None),
        ];
        let ratio = present_ratio(&logs).unwrap();
        assert!((ratio - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(present_ratio(&[]), None);
    }
}

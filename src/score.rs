//! Composite performance score
//!
//! Blends three sub-scores on a 1..=5 scale:
//! manager reviews (weight 0.4), deadline adherence (0.3) and attendance
//! present-ratio (0.3). Scores are computed on demand and never stored.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::task::{self, DeadlineOutcome};
use crate::entity::{attendance_log, review};

pub const REVIEW_WEIGHT: f64 = 0.4;
pub const DEADLINE_WEIGHT: f64 = 0.3;
pub const ATTENDANCE_WEIGHT: f64 = 0.3;

pub const MIN: f64 = 1.0;
pub const MAX: f64 = 5.0;

/// Used for a sub-score that has no underlying data yet.
pub const NEUTRAL: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceScore {
    pub review: f64,
    pub deadline: f64,
    pub attendance: f64,
    pub composite: f64,
}

/// Map a ratio in [0,1] linearly onto [1,5].
pub fn ratio_to_scale(ratio: f64) -> f64 {
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    MIN + ratio * (MAX - MIN)
}

/// Mean review score, `None` without reviews.
pub fn review_score(reviews: &[review::Model]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: i64 = reviews
        .iter()
        .map(|r| i64::from(r.score.clamp(review::MIN_SCORE, review::MAX_SCORE)))
        .sum();
    Some(total as f64 / reviews.len() as f64)
}

/// On-time share of tasks whose outcome is known, mapped to [1,5].
pub fn deadline_score(tasks: &[task::Model], now: DateTime<Utc>) -> Option<f64> {
    let (on_time, late) = tasks
        .iter()
        .fold((0usize, 0usize), |(on_time, late), t| match t.deadline_outcome(now) {
            DeadlineOutcome::OnTime => (on_time + 1, late),
            DeadlineOutcome::Late => (on_time, late + 1),
            DeadlineOutcome::Undecided => (on_time, late),
        });
    let decided = on_time + late;
    if decided == 0 {
        return None;
    }
    Some(ratio_to_scale(on_time as f64 / decided as f64))
}

pub fn attendance_score(logs: &[attendance_log::Model]) -> Option<f64> {
    attendance_log::present_ratio(logs).map(ratio_to_scale)
}

/// Weighted blend of the three sub-scores. Missing sub-scores count as
/// [`NEUTRAL`]; the result is clamped to [1,5].
pub fn composite(review: Option<f64>, deadline: Option<f64>, attendance: Option<f64>) -> PerformanceScore {
    let clamp = |v: Option<f64>| {
        v.filter(|x| x.is_finite())
            .map(|x| x.clamp(MIN, MAX))
            .unwrap_or(NEUTRAL)
    };
    let review = clamp(review);
    let deadline = clamp(deadline);
    let attendance = clamp(attendance);
    let composite = (REVIEW_WEIGHT * review + DEADLINE_WEIGHT * deadline + ATTENDANCE_WEIGHT * attendance)
        .clamp(MIN, MAX);

    PerformanceScore {
        review: round2(review),
        deadline: round2(deadline),
        attendance: round2(attendance),
        composite: round2(composite),
    }
}

/// Score an employee from their raw records.
pub fn evaluate(
    reviews: &[review::Model],
    tasks: &[task::Model],
    logs: &[attendance_log::Model],
    now: DateTime<Utc>,
) -> PerformanceScore {
    composite(
        review_score(reviews),
        deadline_score(tasks, now),
        attendance_score(logs),
    )
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::attendance_log::AttendanceStatus;
    use crate::entity::task::{TaskPriority, TaskStatus};
    use chrono::{Duration, NaiveDate, TimeZone};

    fn review(score: i32) -> review::Model {
        review::Model {
            id: 1,
            organization_id: 1,
            employee_id: 2,
            manager_id: 3,
            score,
            comment: String::new(),
            created_at: Utc::now(),
        }
    }

    fn log(status: AttendanceStatus) -> attendance_log::Model {
        attendance_log::Model {
            id: 1,
            attendance_id: 1,
            log_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            status,
            check_in: None,
            check_out: None,
        }
    }

    fn completed_task(deadline: DateTime<Utc>, done: DateTime<Utc>) -> task::Model {
        task::Model {
            id: 1,
            organization_id: 1,
            title: "t".into(),
            description: String::new(),
            assigned_to: 2,
            assigned_by: 3,
            deadline,
            priority: TaskPriority::Low,
            status: TaskStatus::Completed,
            completed_at: Some(done),
            created_at: deadline - Duration::days(3),
            updated_at: done,
        }
    }

    #[test]
    fn ratio_maps_onto_one_to_five() {
        assert_eq!(ratio_to_scale(0.0), 1.0);
        assert_eq!(ratio_to_scale(0.5), 3.0);
        assert_eq!(ratio_to_scale(1.0), 5.0);
        assert_eq!(ratio_to_scale(2.0), 5.0);
        assert_eq!(ratio_to_scale(f64::NAN), 1.0);
    }

    #[test]
    fn weights_sum_to_one() {
        assert!((REVIEW_WEIGHT + DEADLINE_WEIGHT + ATTENDANCE_WEIGHT - 1.0).abs() < 1e-12);
    }

    #[test]
    fn composite_of_known_inputs() {
        let score = composite(Some(4.0), Some(5.0), Some(2.0));
        // 0.4*4 + 0.3*5 + 0.3*2 = 3.7
        assert_eq!(score.composite, 3.7);
    }

    #[test]
    fn missing_data_is_neutral() {
        let score = composite(None, None, None);
        assert_eq!(score.composite, NEUTRAL);
    }

    #[test]
    fn composite_stays_in_range_for_any_input() {
        let samples = [
            None,
            Some(f64::NEG_INFINITY),
            Some(-10.0),
            Some(0.0),
            Some(1.0),
            Some(2.5),
            Some(5.0),
            Some(99.0),
            Some(f64::NAN),
        ];
        for r in samples {
            for d in samples {
                for a in samples {
                    let s = composite(r, d, a).composite;
                    assert!((MIN..=MAX).contains(&s), "{:?} {:?} {:?} -> {}", r, d, a, s);
                }
            }
        }
    }

    #[test]
    fn evaluate_from_records() {
        let deadline = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let reviews = vec![review(5), review(3)];
        let tasks = vec![
            completed_task(deadline, deadline - Duration::hours(2)),
            completed_task(deadline, deadline + Duration::hours(2)),
        ];
        let logs = vec![
            log(AttendanceStatus::Present),
            log(AttendanceStatus::Present),
            log(AttendanceStatus::Present),
            log(AttendanceStatus::Absent),
        ];
        let score = evaluate(&reviews, &tasks, &logs, deadline + Duration::days(1));
        assert_eq!(score.review, 4.0);
        assert_eq!(score.deadline, 3.0);
        assert_eq!(score.attendance, 4.0);
        // 1.6 + 0.9 + 1.2
        assert_eq!(score.composite, 3.7);
    }
}

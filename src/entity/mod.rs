//! Entity module - SeaORM entity definitions
//!
//! One module per table. Every organization-scoped table carries an
//! `organization_id`; cross-table references are plain `i64` ids resolved by
//! explicit lookups in the handlers.

pub mod attendance;
pub mod attendance_log;
pub mod balance;
pub mod department;
pub mod employee;
pub mod generate_request;
pub mod human_resource;
pub mod interview_insight;
pub mod leave;
pub mod notice;
pub mod notification_view;
pub mod organization;
pub mod review;
pub mod salary;
pub mod task;
pub mod task_comment;

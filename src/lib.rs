//! Hrdesk - An HR management backend
//!
//! This crate provides the core functionality for the Hrdesk service:
//! organizations and their HR-Admins, employees, departments, attendance,
//! leave and requisition approvals, payroll, notices, interviews and the
//! manager panel with composite performance scores.

pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod permission;
pub mod routes;
pub mod score;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use routes::create_router;
pub use state::AppState;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::mail::{Email, MailQueue};
use crate::permission::PermissionEnforcer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
    /// Role permission enforcer
    pub perm: PermissionEnforcer,
    /// Application configuration
    pub config: Arc<Config>,
    /// Outbound mail queue
    pub mail: MailQueue,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: DatabaseConnection,
        perm: PermissionEnforcer,
        config: Config,
        mail: MailQueue,
    ) -> Self {
        Self {
            db: Arc::new(db),
            perm,
            config: Arc::new(config),
            mail,
        }
    }

    /// Queue a message for delivery
    pub fn send_mail(&self, email: Email) {
        self.mail.enqueue(email);
    }
}

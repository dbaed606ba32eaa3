//! Outbound transactional mail
//!
//! Handlers enqueue messages on a bounded channel; a background task drains
//! it and hands each message to a [`Mailer`]. Delivery failures are logged
//! and never surface to the request that queued the mail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::MailConfig;

const QUEUE_CAPACITY: usize = 200;

/// A message ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

/// Delivers over SMTP (STARTTLS, or implicit TLS on port 465)
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let builder = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        };
        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(email.to.parse()?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)?;
        self.transport.send(message).await?;
        Ok(())
    }
}

/// Used when mail is disabled: records the message in the log only
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "Mail delivery disabled, message not sent");
        Ok(())
    }
}

/// Handle used by handlers to queue mail
#[derive(Clone)]
pub struct MailQueue {
    tx: mpsc::Sender<Email>,
}

impl MailQueue {
    /// Spawn the delivery task and return a queue feeding it
    pub fn start(mailer: Arc<dyn Mailer>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Email>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(email) = rx.recv().await {
                let to = email.to.clone();
                if let Err(e) = mailer.send(email).await {
                    tracing::error!("Failed to send mail to {}: {}", to, e);
                }
            }
        });

        Self { tx }
    }

    /// Build the mailer the configuration asks for and start the queue
    pub fn from_config(config: &MailConfig) -> anyhow::Result<Self> {
        let mailer: Arc<dyn Mailer> = if config.enabled {
            Arc::new(SmtpMailer::new(config)?)
        } else {
            Arc::new(LogMailer)
        };
        Ok(Self::start(mailer))
    }

    pub fn enqueue(&self, email: Email) {
        if self.tx.try_send(email).is_err() {
            tracing::warn!("Mail queue is full, message dropped");
        }
    }
}

/// Message builders
pub mod templates {
    use super::*;

    pub fn verification(to: &str, name: &str, client_url: &str, token: &str) -> Email {
        Email {
            to: to.to_string(),
            subject: "Verify your email".to_string(),
            body: format!(
                "Hello {},\n\nConfirm your email address by opening:\n{}/auth/verify-email?token={}\n\nThe link expires in {} hours.",
                name,
                client_url.trim_end_matches('/'),
                token,
                crate::auth::VERIFY_TOKEN_HOURS
            ),
        }
    }

    pub fn password_reset(to: &str, client_url: &str, path: &str, token: &str) -> Email {
        Email {
            to: to.to_string(),
            subject: "Reset your password".to_string(),
            body: format!(
                "A password reset was requested for this account.\n\nSet a new password at:\n{}/{}/{}\n\nThe link expires in {} hour. Ignore this mail if you did not ask for it.",
                client_url.trim_end_matches('/'),
                path.trim_matches('/'),
                token,
                crate::auth::RESET_TOKEN_HOURS
            ),
        }
    }

    pub fn welcome(to: &str, name: &str, organization: &str) -> Email {
        Email {
            to: to.to_string(),
            subject: format!("Welcome to {}", organization),
            body: format!(
                "Hello {},\n\nYour account at {} is ready.",
                name, organization
            ),
        }
    }

    pub fn employee_welcome(to: &str, name: &str, organization: &str, client_url: &str, password: &str) -> Email {
        Email {
            to: to.to_string(),
            subject: format!("Your {} employee account", organization),
            body: format!(
                "Hello {},\n\nAn account was created for you at {}.\nSign in at {}/auth/employee/login with this email and the temporary password: {}\n\nPlease change it after your first login.",
                name,
                organization,
                client_url.trim_end_matches('/'),
                password
            ),
        }
    }

    pub fn interview_scheduled(to: &str, applicant: &str, position: &str, at: DateTime<Utc>) -> Email {
        Email {
            to: to.to_string(),
            subject: format!("Interview scheduled: {}", position),
            body: format!(
                "Hello {},\n\nYour interview for the {} position is scheduled for {} (UTC).",
                applicant,
                position,
                at.format("%Y-%m-%d %H:%M")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder(Arc<Mutex<Vec<Email>>>);

    #[async_trait]
    impl Mailer for Recorder {
        async fn send(&self, email: Email) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(email);
            Ok(())
        }
    }

    #[tokio::test]
    async fn queued_mail_reaches_mailer() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let queue = MailQueue::start(Arc::new(Recorder(sent.clone())));
        queue.enqueue(templates::welcome("a@example.com", "Ada", "Acme"));

        for _ in 0..50 {
            if !sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Welcome to Acme");
    }

    #[test]
    fn reset_link_is_well_formed() {
        let email = templates::password_reset("a@example.com", "https://hr.example.com/", "/auth/reset-password/", "abc");
        assert!(email.body.contains("https://hr.example.com/auth/reset-password/abc"));
    }

    #[test]
    fn verification_link_carries_token() {
        let email = templates::verification("a@example.com", "Ada", "http://localhost:5173", "tok");
        assert!(email.body.contains("http://localhost:5173/auth/verify-email?token=tok"));
    }
}

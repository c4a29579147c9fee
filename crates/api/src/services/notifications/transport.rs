//! Mail transports.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::ExposeSecret;
use tokio::sync::Mutex;

use super::{NotificationError, OutgoingMail};
use crate::config::EmailConfig;

/// Something that can deliver an [`OutgoingMail`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver one message.
    async fn send(&self, mail: &OutgoingMail) -> Result<(), NotificationError>;
}

/// SMTP relay transport (STARTTLS).
#[derive(Clone)]
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpTransport {
    /// Create a new SMTP transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, NotificationError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), NotificationError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotificationError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(mail
                .to
                .as_str()
                .parse()
                .map_err(|_| NotificationError::InvalidAddress(mail.to.to_string()))?)
            .subject(&mail.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(mail.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(mail.html.clone()),
                    ),
            )?;

        self.mailer.send(message).await?;

        tracing::info!(to = %mail.to, subject = %mail.subject, "Email sent successfully");
        Ok(())
    }
}

/// Used when no relay credentials are configured: logs and drops the message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTransport;

#[async_trait]
impl MailTransport for DisabledTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), NotificationError> {
        tracing::warn!(
            to = %mail.to,
            subject = %mail.subject,
            "Email relay not configured, message dropped"
        );
        Ok(())
    }
}

/// Keeps every message in memory. Used by tests.
///
/// Recipients listed with [`RecordingTransport::fail_for`] are rejected
/// instead of recorded.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<OutgoingMail>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl RecordingTransport {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every future message addressed to `address`.
    pub async fn fail_for(&self, address: &str) {
        self.failing.lock().await.push(address.to_lowercase());
    }

    /// Messages delivered so far, oldest first.
    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), NotificationError> {
        if self
            .failing
            .lock()
            .await
            .iter()
            .any(|a| a == mail.to.as_str())
        {
            return Err(NotificationError::Rejected(mail.to.to_string()));
        }
        self.sent.lock().await.push(mail.clone());
        Ok(())
    }
}

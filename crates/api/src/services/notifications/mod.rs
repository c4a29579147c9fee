//! Order notification mail.
//!
//! Placing an order hands an [`OrderPlaced`] job to the
//! [`NotificationDispatcher`]; a background worker renders the customer
//! confirmation and the admin alert ([`templates`]) and sends them through a
//! [`MailTransport`]. Delivery is best-effort: failures are logged and never
//! reach the request that placed the order.

mod dispatcher;
pub mod templates;
mod transport;

pub use dispatcher::{MailSettings, NotificationDispatcher};
pub use transport::{DisabledTransport, MailTransport, RecordingTransport, SmtpTransport};

use thiserror::Error;

use authentic_core::Email;

use crate::models::{Order, User};

/// Errors that can occur when rendering or sending mail.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Simulated failure from a test transport.
    #[error("Transport rejected message: {0}")]
    Rejected(String),
}

/// A rendered message ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: Email,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Who receives the order confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub email: Email,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl Recipient {
    /// The attributed account's contact details.
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            name: Some(user.name.clone()),
            phone: user.phone.clone(),
        }
    }
}

/// Notification job for a freshly placed order.
#[derive(Debug, Clone)]
pub struct OrderPlaced {
    pub order: Order,
    pub recipient: Recipient,
}

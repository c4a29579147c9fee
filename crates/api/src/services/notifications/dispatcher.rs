//! Background delivery of order notifications.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use authentic_core::Email;

use super::{MailTransport, OrderPlaced, templates};

/// Addresses and links the worker needs.
#[derive(Debug, Clone)]
pub struct MailSettings {
    /// Mailbox receiving order alerts. `None` skips the alert.
    pub admin_email: Option<Email>,
    /// Public storefront origin for dashboard links.
    pub client_url: String,
}

enum Job {
    OrderPlaced(Box<OrderPlaced>),
    Flush(oneshot::Sender<()>),
}

/// Queue plus worker task that sends order mail off the request path.
///
/// `dispatch` never blocks and never fails the caller. Messages are sent one
/// job at a time; each send failure is logged and not retried.
pub struct NotificationDispatcher {
    tx: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationDispatcher {
    /// Start the worker on the current tokio runtime.
    #[must_use]
    pub fn spawn(transport: Arc<dyn MailTransport>, settings: MailSettings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx, transport, settings));
        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    fn sender(&self) -> Option<mpsc::UnboundedSender<Job>> {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Queue notifications for a placed order.
    pub fn dispatch(&self, job: OrderPlaced) {
        let order_id = job.order.id;
        let queued = self
            .sender()
            .is_some_and(|tx| tx.send(Job::OrderPlaced(Box::new(job))).is_ok());
        if !queued {
            warn!(%order_id, "Notification queue closed, order mail dropped");
        }
    }

    /// Wait until every job queued before this call has been processed.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if let Some(tx) = self.sender()
            && tx.send(Job::Flush(done_tx)).is_ok()
        {
            let _ = done_rx.await;
        }
    }

    /// Close the queue and wait for queued mail to drain.
    pub async fn shutdown(&self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker
            && let Err(e) = worker.await
        {
            error!(error = %e, "Notification worker panicked");
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Job>,
    transport: Arc<dyn MailTransport>,
    settings: MailSettings,
) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::OrderPlaced(job) => deliver(&job, transport.as_ref(), &settings).await,
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    info!("Notification worker stopped");
}

async fn deliver(job: &OrderPlaced, transport: &dyn MailTransport, settings: &MailSettings) {
    let order_id = job.order.id;

    match templates::order_confirmation(job) {
        Ok(mail) => match transport.send(&mail).await {
            Ok(()) => info!(%order_id, to = %mail.to, "Order confirmation sent"),
            Err(e) => error!(%order_id, error = %e, "Order confirmation failed"),
        },
        Err(e) => error!(%order_id, error = %e, "Order confirmation could not be rendered"),
    }

    let Some(admin) = &settings.admin_email else {
        warn!(%order_id, "Admin mailbox not configured, order alert skipped");
        return;
    };
    match templates::order_alert(job, admin, &settings.client_url) {
        Ok(mail) => match transport.send(&mail).await {
            Ok(()) => info!(%order_id, "Order alert sent"),
            Err(e) => error!(%order_id, error = %e, "Order alert failed"),
        },
        Err(e) => error!(%order_id, error = %e, "Order alert could not be rendered"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::OrderDraft;
    use crate::services::notifications::{Recipient, RecordingTransport};

    fn job(email: &str) -> OrderPlaced {
        let draft: OrderDraft = serde_json::from_value(serde_json::json!({
            "orderItems": [{"name": "Saree", "qty": 2, "image": "s.jpg", "price": 500,
                            "product": "0b7c5a1e-8d2f-4e4b-9a61-3f2d1c0e9a7b"}],
            "guestInfo": {"name": "Mita", "email": email},
            "shippingAddress": {"address": "1 GEC Circle", "city": "Chittagong",
                                "postalCode": "4000", "country": "Bangladesh"},
            "paymentMethod": "Cash on Delivery",
            "totalPrice": 1000
        }))
        .unwrap();
        OrderPlaced {
            order: draft.into_order(None, Utc::now()).unwrap(),
            recipient: Recipient {
                email: Email::parse(email).unwrap(),
                name: Some("Mita".to_owned()),
                phone: None,
            },
        }
    }

    fn settings(admin: Option<&str>) -> MailSettings {
        MailSettings {
            admin_email: admin.map(|a| Email::parse(a).unwrap()),
            client_url: "http://localhost:5173".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_sends_confirmation_then_alert() {
        let transport = RecordingTransport::new();
        let dispatcher =
            NotificationDispatcher::spawn(Arc::new(transport.clone()), settings(Some("admin@shop.com")));

        dispatcher.dispatch(job("mita@example.com"));
        dispatcher.flush().await;

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to.as_str(), "mita@example.com");
        assert!(sent[0].subject.starts_with("Order Confirmation"));
        assert_eq!(sent[1].to.as_str(), "admin@shop.com");
        assert!(sent[1].subject.starts_with("New Order Alert"));
    }

    #[tokio::test]
    async fn test_customer_failure_does_not_block_alert() {
        let transport = RecordingTransport::new();
        transport.fail_for("mita@example.com").await;
        let dispatcher =
            NotificationDispatcher::spawn(Arc::new(transport.clone()), settings(Some("admin@shop.com")));

        dispatcher.dispatch(job("mita@example.com"));
        dispatcher.flush().await;

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to.as_str(), "admin@shop.com");
    }

    #[tokio::test]
    async fn test_alert_skipped_without_admin_mailbox() {
        let transport = RecordingTransport::new();
        let dispatcher = NotificationDispatcher::spawn(Arc::new(transport.clone()), settings(None));

        dispatcher.dispatch(job("mita@example.com"));
        dispatcher.flush().await;

        assert_eq!(transport.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let transport = RecordingTransport::new();
        let dispatcher =
            NotificationDispatcher::spawn(Arc::new(transport.clone()), settings(Some("admin@shop.com")));

        dispatcher.dispatch(job("a@example.com"));
        dispatcher.dispatch(job("b@example.com"));
        dispatcher.shutdown().await;

        assert_eq!(transport.sent().await.len(), 4);

        // Dispatch after shutdown is dropped quietly.
        dispatcher.dispatch(job("c@example.com"));
        dispatcher.flush().await;
        assert_eq!(transport.sent().await.len(), 4);
    }
}

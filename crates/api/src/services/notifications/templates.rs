//! Order mail rendering.

use askama::Template;

use authentic_core::{Email, ShippingAddress};

use super::{NotificationError, OrderPlaced, OutgoingMail};

struct MailItem<'a> {
    name: &'a str,
    qty: u32,
    price: String,
}

struct OrderSummary<'a> {
    reference: String,
    items: Vec<MailItem<'a>>,
    total: String,
    shipping: &'a ShippingAddress,
    payment_method: &'a str,
    transaction_id: Option<&'a str>,
    payment_number: Option<&'a str>,
}

impl<'a> OrderSummary<'a> {
    fn new(job: &'a OrderPlaced) -> Self {
        let order = &job.order;
        let details = order.payment_details.as_ref();
        Self {
            reference: order.id.reference(),
            items: order
                .items
                .iter()
                .map(|item| MailItem {
                    name: &item.name,
                    qty: item.qty,
                    price: item.price.to_string(),
                })
                .collect(),
            total: order.total_price.to_string(),
            shipping: &order.shipping_address,
            payment_method: order.payment_method.as_str(),
            transaction_id: details.and_then(|d| d.transaction_id.as_deref()),
            payment_number: details.and_then(|d| d.phone_number.as_deref()),
        }
    }
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct ConfirmationHtml<'a> {
    name: &'a str,
    summary: &'a OrderSummary<'a>,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct ConfirmationText<'a> {
    name: &'a str,
    summary: &'a OrderSummary<'a>,
}

#[derive(Template)]
#[template(path = "email/order_alert.html")]
struct AlertHtml<'a> {
    customer_name: &'a str,
    customer_email: &'a str,
    customer_phone: &'a str,
    dashboard_url: &'a str,
    summary: &'a OrderSummary<'a>,
}

#[derive(Template)]
#[template(path = "email/order_alert.txt")]
struct AlertText<'a> {
    customer_name: &'a str,
    customer_email: &'a str,
    customer_phone: &'a str,
    dashboard_url: &'a str,
    summary: &'a OrderSummary<'a>,
}

/// Confirmation addressed to the buyer.
///
/// # Errors
///
/// Returns `NotificationError::Template` if rendering fails.
pub fn order_confirmation(job: &OrderPlaced) -> Result<OutgoingMail, NotificationError> {
    let summary = OrderSummary::new(job);
    let name = job.recipient.name.as_deref().unwrap_or("Customer");

    Ok(OutgoingMail {
        to: job.recipient.email.clone(),
        subject: format!("Order Confirmation - Order #{}", summary.reference),
        html: ConfirmationHtml {
            name,
            summary: &summary,
        }
        .render()?,
        text: ConfirmationText {
            name,
            summary: &summary,
        }
        .render()?,
    })
}

/// Alert addressed to the shop's admin mailbox.
///
/// # Errors
///
/// Returns `NotificationError::Template` if rendering fails.
pub fn order_alert(
    job: &OrderPlaced,
    admin: &Email,
    client_url: &str,
) -> Result<OutgoingMail, NotificationError> {
    let summary = OrderSummary::new(job);
    let customer_name = job.recipient.name.as_deref().unwrap_or("N/A");
    let customer_email = job.recipient.email.as_str();
    let customer_phone = job.recipient.phone.as_deref().unwrap_or("N/A");
    let dashboard_url = format!("{client_url}/admin/orders");

    Ok(OutgoingMail {
        to: admin.clone(),
        subject: format!("New Order Alert - Order #{}", summary.reference),
        html: AlertHtml {
            customer_name,
            customer_email,
            customer_phone,
            dashboard_url: &dashboard_url,
            summary: &summary,
        }
        .render()?,
        text: AlertText {
            customer_name,
            customer_email,
            customer_phone,
            dashboard_url: &dashboard_url,
            summary: &summary,
        }
        .render()?,
    })
}

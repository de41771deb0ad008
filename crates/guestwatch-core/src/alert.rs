//! Alert events and the fixed message templates rendered from them.
//!
//! The wording is consumed by people who already recognise these messages;
//! keep it byte-for-byte stable.

use crate::config::DisplayConfig;
use crate::error::Result;
use crate::evaluate::{AlertKind, Finding};
use crate::order::Order;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

const LONG_FORMAT: &str = "%B %d, %Y at %I:%M %p";
const SHORT_FORMAT: &str = "%m/%d at %I:%M%p";

/// Everything needed to render one order's alert on every channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub order_id: String,
    pub order_number: String,
    pub kind: AlertKind,
    pub occurred_at: Option<DateTime<Utc>>,
    /// e.g. `September 04, 2025 at 07:27 PM EST`
    pub local_datetime: String,
    /// e.g. `09/04 at 07:27PM EST`
    pub local_short: String,
    pub customer_name: String,
    pub associate_name: String,
    pub amount: String,
    pub product_names: Vec<String>,
}

impl AlertEvent {
    pub fn new(order: &Order, finding: Finding, display: &DisplayConfig) -> Result<Self> {
        let tz = display.tz()?;
        let occurred_at = order.created_at();
        let (local_datetime, local_short) = match occurred_at {
            Some(ts) => (
                format_local(ts, tz, LONG_FORMAT, &display.label),
                format_local(ts, tz, SHORT_FORMAT, &display.label),
            ),
            None => ("Unknown".to_string(), "just now".to_string()),
        };
        Ok(Self {
            order_id: order.id.clone(),
            order_number: order.display_number(),
            kind: finding.kind,
            occurred_at,
            local_datetime,
            local_short,
            customer_name: order.customer_name(),
            associate_name: order.associate_name(),
            amount: order.amount_display(),
            product_names: finding.product_names,
        })
    }

    pub fn email_subject(&self) -> String {
        format!("Missing Guest Count Alert - Order {}", self.order_number)
    }

    pub fn email_body(&self) -> String {
        let (first_line, reminder) = match self.kind {
            AlertKind::Tasting => (
                format!(
                    "{} just completed a tasting without a guest count.",
                    self.associate_name
                ),
                "Please remind them to input guest count data for all tasting orders.",
            ),
            AlertKind::CollectionOrder => (
                format!(
                    "{} just submitted an order without a guest count.",
                    self.associate_name
                ),
                "Please remind them to input guest count data for all orders.",
            ),
        };
        format!(
            "{first_line}\n\
             \n\
             Order Details:\n\
             • Order Number: {}\n\
             • Date/Time: {}\n\
             • Customer: {}\n\
             • Total Amount: ${}\n\
             • Products: {}\n\
             \n\
             {reminder}\n\
             \n\
             This is an automated alert from the Guest Count Check system.",
            self.order_number,
            self.local_datetime,
            self.customer_name,
            self.amount,
            self.product_names.join(", "),
        )
    }

    pub fn sms_body(&self) -> String {
        let (action, preposition) = match self.kind {
            AlertKind::Tasting => ("just did a tasting", "on"),
            AlertKind::CollectionOrder => ("just submitted an order", "at"),
        };
        format!(
            "{} {action} without a guest count. Order #{} occurred {preposition} {}. \
             Please remind them to input guest count data.",
            self.associate_name, self.order_number, self.local_short,
        )
    }
}

fn format_local(ts: DateTime<Utc>, tz: Tz, fmt: &str, label: &str) -> String {
    format!("{} {label}", ts.with_timezone(&tz).format(fmt))
}

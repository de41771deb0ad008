use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// An order as returned by the Commerce7 order API. Read-only.
///
/// Only the fields the evaluator and the alert templates consume are mapped;
/// everything else in the payload is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub order_number: Option<u64>,
    #[serde(default)]
    pub order_paid_date: Option<String>,
    #[serde(default)]
    pub order_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub guest_count: Option<i64>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub customer: Option<Party>,
    #[serde(default)]
    pub sales_associate: Option<Party>,
    /// Total in cents.
    #[serde(default)]
    pub total_amount: i64,
}

impl Order {
    /// Paid date when present, else order date. `None` when neither parses.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self
            .order_paid_date
            .as_deref()
            .or(self.order_date.as_deref())?;
        match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                tracing::warn!(order = %self.id, raw, error = %e, "unparseable order timestamp");
                None
            }
        }
    }

    pub fn display_number(&self) -> String {
        self.order_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn customer_name(&self) -> String {
        self.customer
            .as_ref()
            .and_then(Party::display_name)
            .unwrap_or_else(|| "Unknown Customer".to_string())
    }

    pub fn associate_name(&self) -> String {
        self.sales_associate
            .as_ref()
            .and_then(Party::display_name)
            .unwrap_or_else(|| "Unknown Associate".to_string())
    }

    /// Sum of item quantities; items without a quantity count once.
    pub fn total_quantity(&self) -> i64 {
        self.items
            .iter()
            .map(|i| i.quantity.unwrap_or(1))
            .fold(0i64, i64::saturating_add)
    }

    /// Total formatted as dollars with two decimals, without the `$`.
    pub fn amount_display(&self) -> String {
        let sign = if self.total_amount < 0 { "-" } else { "" };
        let cents = self.total_amount.unsigned_abs();
        format!("{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

// ---------------------------------------------------------------------------
// LineItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_title: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub collection_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub guest_count: Option<i64>,
}

impl LineItem {
    pub fn display_name(&self) -> String {
        self.product_title
            .clone()
            .or_else(|| self.product_name.clone())
            .unwrap_or_else(|| "Unknown Product".to_string())
    }
}

// ---------------------------------------------------------------------------
// Party (customer / sales associate)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl Party {
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }
}

// ---------------------------------------------------------------------------
// Lenient integer fields
// ---------------------------------------------------------------------------

/// Accepts integers, integral floats and numeric strings. Anything else
/// (null, text, objects) reads as `None` instead of failing the whole page.
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value))
}

fn count_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

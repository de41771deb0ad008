//! Commerce7 order API adapter.
//!
//! The API only filters by calendar date, so this pulls every order paid on
//! or after the window's start day and narrows to the exact window locally.

use crate::config::{CommerceConfig, WatchList};
use crate::credentials::CommerceCredentials;
use crate::error::{GuestwatchError, Result};
use crate::order::Order;
use crate::source::{OrderSource, Window};
use chrono::Duration;
use reqwest::blocking::Client;
use serde::Deserialize;

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct OrderPage {
    #[serde(default)]
    orders: Vec<Order>,
    #[serde(default)]
    total: Option<u64>,
}

pub struct CommerceClient {
    http: Client,
    base_url: String,
    credentials: CommerceCredentials,
    page_limit: u32,
    max_pages: u32,
}

impl CommerceClient {
    pub fn new(config: &CommerceConfig, credentials: CommerceCredentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GuestwatchError::Fetch(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credentials,
            page_limit: config.page_limit.max(1),
            max_pages: config.max_pages.max(1),
        })
    }

    /// Cheap authenticated request to confirm credentials and tenant.
    /// Returns the number of orders in the one-item page.
    pub fn ping(&self) -> Result<usize> {
        let page = self.get_page(&[("limit", "1".to_string())])?;
        Ok(page.orders.len())
    }

    fn get_page(&self, params: &[(&str, String)]) -> Result<OrderPage> {
        let url = format!("{}/order", self.base_url);
        tracing::debug!(url = %url, ?params, "requesting orders");
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.credentials.app_id, Some(&self.credentials.api_key))
            .header("Tenant", &self.credentials.tenant_id)
            .query(params)
            .send()
            .map_err(|e| GuestwatchError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GuestwatchError::Fetch(format!(
                "{url} returned {status}: {}",
                body.trim()
            )));
        }

        response
            .json::<OrderPage>()
            .map_err(|e| GuestwatchError::Fetch(format!("decoding order page: {e}")))
    }
}

impl OrderSource for CommerceClient {
    fn fetch_orders(&self, window: &Window, watch: &WatchList) -> Result<Vec<Order>> {
        // One day of slack: the API interprets the date in the tenant's zone.
        let since_day = (window.start - Duration::days(1)).date_naive();
        let limit = self.page_limit as usize;

        let mut retrieved = Vec::new();
        let mut exhausted = false;
        for page in 1..=self.max_pages {
            let batch = self.get_page(&[
                ("orderPaidDate", format!("gte:{since_day}")),
                ("limit", self.page_limit.to_string()),
                ("page", page.to_string()),
            ])?;
            let received = batch.orders.len();
            retrieved.extend(batch.orders);

            exhausted = received < limit
                || batch
                    .total
                    .is_some_and(|total| retrieved.len() as u64 >= total);
            if exhausted {
                break;
            }
        }

        // A partial fetch must not advance the checkpoint past unseen orders.
        if !exhausted {
            return Err(GuestwatchError::Fetch(format!(
                "page cap reached: {} pages of {} orders did not cover the window",
                self.max_pages, self.page_limit
            )));
        }

        let retrieved_count = retrieved.len();
        let candidates: Vec<Order> = retrieved
            .into_iter()
            .filter(|o| match o.created_at() {
                Some(ts) => window.contains(ts),
                None => {
                    tracing::warn!(order = %o.id, "order has no usable timestamp, skipped");
                    false
                }
            })
            .filter(|o| is_candidate(o, watch))
            .collect();

        tracing::info!(
            retrieved = retrieved_count,
            candidates = candidates.len(),
            window_start = %window.start,
            window_end = %window.end,
            "fetched orders"
        );
        Ok(candidates)
    }
}

fn is_candidate(order: &Order, watch: &WatchList) -> bool {
    order.items.iter().any(|item| {
        watch.contains_product(&item.product_id)
            || watch
                .collections
                .iter()
                .any(|rule| item.collection_ids.contains(&rule.collection_id))
    })
}

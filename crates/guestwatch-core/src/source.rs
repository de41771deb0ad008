use crate::config::WatchList;
use crate::error::Result;
use crate::order::Order;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// The closed interval of order timestamps a run examines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// `[last_checked_at - overlap, now]`. A clock that went backwards yields
    /// an empty-looking window rather than an inverted one.
    pub fn since(last_checked_at: DateTime<Utc>, overlap: Duration, now: DateTime<Utc>) -> Self {
        let start = last_checked_at - overlap;
        Self {
            start: start.min(now),
            end: now,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Where candidate orders come from.
///
/// Implementations must be restartable: fetching the same window twice
/// returns the same orders. An empty result is `Ok(vec![])`; only transport
/// or protocol problems are errors.
pub trait OrderSource {
    fn fetch_orders(&self, window: &Window, watch: &WatchList) -> Result<Vec<Order>>;
}

impl<T: OrderSource + ?Sized> OrderSource for &T {
    fn fetch_orders(&self, window: &Window, watch: &WatchList) -> Result<Vec<Order>> {
        (**self).fetch_orders(window, watch)
    }
}

use crate::config::WatchList;
use crate::order::{LineItem, Order};
use serde::Serialize;

// ---------------------------------------------------------------------------
// AlertKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// A watched tasting product without a guest count.
    Tasting,
    /// A larger order from a watched collection without a guest count.
    CollectionOrder,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Tasting => write!(f, "tasting"),
            AlertKind::CollectionOrder => write!(f, "collection_order"),
        }
    }
}

/// Why an order qualifies, and which of its products triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: AlertKind,
    pub product_names: Vec<String>,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

pub fn qualifies(order: &Order, watch: &WatchList) -> bool {
    evaluate(order, watch).is_some()
}

/// Tasting products take precedence: an order with any watched product is
/// judged only on those items, never on the collection rules.
pub fn evaluate(order: &Order, watch: &WatchList) -> Option<Finding> {
    let tasting: Vec<&LineItem> = order
        .items
        .iter()
        .filter(|item| watch.contains_product(&item.product_id))
        .collect();

    if !tasting.is_empty() {
        return tasting
            .iter()
            .any(|item| !has_guest_count(item, order))
            .then(|| Finding {
                kind: AlertKind::Tasting,
                product_names: tasting.iter().map(|i| i.display_name()).collect(),
            });
    }

    let total_quantity = order.total_quantity();
    watch.collections.iter().find_map(|rule| {
        let in_collection: Vec<&LineItem> = order
            .items
            .iter()
            .filter(|item| item.collection_ids.contains(&rule.collection_id))
            .collect();
        let triggered = !in_collection.is_empty()
            && total_quantity >= rule.min_total_quantity
            && in_collection.iter().any(|item| !has_guest_count(item, order));
        triggered.then(|| Finding {
            kind: AlertKind::CollectionOrder,
            product_names: in_collection.iter().map(|i| i.display_name()).collect(),
        })
    })
}

/// The item's own guest count wins; the order-level field is the fallback.
fn has_guest_count(item: &LineItem, order: &Order) -> bool {
    item.guest_count
        .or(order.guest_count)
        .is_some_and(|n| n >= 1)
}

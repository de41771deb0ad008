use crate::order::Order;
use std::collections::{BTreeSet, HashSet};

/// Drop orders whose identifier is already in `alerted`, keeping input order.
///
/// Consecutive windows overlap, so the same order is routinely fetched twice;
/// this is the only thing standing between that overlap and a second alert.
/// Repeats within one batch collapse to their first occurrence.
pub fn filter_new(qualifying: Vec<Order>, alerted: &BTreeSet<String>) -> Vec<Order> {
    let mut seen: HashSet<String> = HashSet::new();
    qualifying
        .into_iter()
        .filter(|o| !alerted.contains(&o.id) && seen.insert(o.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order(id: &str) -> Order {
        serde_json::from_value(json!({"id": id})).unwrap()
    }

    fn ids(orders: &[Order]) -> Vec<&str> {
        orders.iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn removes_alerted_and_preserves_order() {
        let alerted: BTreeSet<String> = ["b".to_string()].into();
        let out = filter_new(vec![order("c"), order("b"), order("a")], &alerted);
        assert_eq!(ids(&out), vec!["c", "a"]);
    }

    #[test]
    fn collapses_repeats_within_batch() {
        let out = filter_new(vec![order("a"), order("b"), order("a")], &BTreeSet::new());
        assert_eq!(ids(&out), vec!["a", "b"]);
    }

    #[test]
    fn second_pass_after_merge_is_empty() {
        let batch = vec![order("x"), order("y")];
        let mut alerted = BTreeSet::new();

        let first = filter_new(batch.clone(), &alerted);
        assert_eq!(first.len(), 2);
        alerted.extend(first.into_iter().map(|o| o.id));

        assert!(filter_new(batch, &alerted).is_empty());
    }
}

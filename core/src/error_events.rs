use crate::item::{ParentKey, WaterfallItem};
use crate::tree::place_item;
use itertools::Itertools;
use std::collections::HashMap;

/// Place error events next to the items they were raised in and keep only
/// those that belong to the entry transaction's subtree.
///
/// `errors` are normalized error items, `items` the ordered waterfall with
/// the entry first. Errors never become parents themselves.
pub fn attach_errors(errors: Vec<WaterfallItem>, items: &[WaterfallItem]) -> Vec<WaterfallItem> {
    let Some(entry) = items.first() else {
        return Vec::new();
    };

    let items_by_id: HashMap<&str, &WaterfallItem> =
        items.iter().map(|item| (item.id.as_str(), item)).collect();

    let placed: Vec<WaterfallItem> = errors
        .into_iter()
        .map(|error| {
            let parent = error.parent.id().and_then(|id| items_by_id.get(id).copied());
            place_item(error, entry.timestamp_micros, parent)
        })
        .collect();

    let parent_lookup: HashMap<&str, &ParentKey> = items
        .iter()
        .chain(placed.iter())
        .map(|item| (item.id.as_str(), &item.parent))
        .collect();

    let retained: Vec<bool> = placed
        .iter()
        .map(|error| reaches_entry(&parent_lookup, &entry.id, &error.id))
        .collect();

    let dropped = retained.iter().filter(|keep| !**keep).count();
    if dropped > 0 {
        tracing::debug!(
            "Dropped {} error(s) outside the subtree of entry transaction {}",
            dropped,
            entry.id
        );
    }

    placed
        .into_iter()
        .zip(retained)
        .filter_map(|(error, keep)| keep.then_some(error))
        .collect()
}

/// Walk parent links upward from `start`. The walk is bounded by the lookup
/// size, so a cycle ends as "not reachable".
fn reaches_entry(parent_lookup: &HashMap<&str, &ParentKey>, entry_id: &str, start: &str) -> bool {
    let mut current = start;
    for _ in 0..=parent_lookup.len() {
        if current == entry_id {
            return true;
        }
        match parent_lookup.get(current).and_then(|parent| parent.id()) {
            Some(parent_id) => current = parent_id,
            None => return false,
        }
    }
    false
}

/// Errors per direct parent id. Counts are never propagated to ancestors.
pub fn count_errors_by_parent(errors: &[WaterfallItem]) -> HashMap<String, usize> {
    errors
        .iter()
        .filter_map(|error| error.parent.id())
        .map(String::from)
        .counts()
}

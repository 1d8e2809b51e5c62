use crate::document::DocType;
use crate::item::{ParentKey, WaterfallItem};
use std::collections::{HashMap, HashSet};

/// Rewrite parents declared through spans' forward `child_ids` references.
///
/// The declaring span wins over the child's own `parent_id`. Items not named
/// by any span keep their parent. A span with an empty id declares nothing.
pub fn reparent_spans(items: Vec<WaterfallItem>) -> Vec<WaterfallItem> {
    let mut declared_parents: HashMap<String, String> = HashMap::new();
    for item in items
        .iter()
        .filter(|item| item.doc_type == DocType::Span && !item.id.is_empty())
    {
        for child_id in item.document.child_ids() {
            declared_parents.insert(child_id.clone(), item.id.clone());
        }
    }

    if declared_parents.is_empty() {
        return items;
    }

    items
        .into_iter()
        .map(|item| match declared_parents.get(&item.id) {
            Some(parent_id) => WaterfallItem {
                parent: ParentKey::Id(parent_id.clone()),
                ..item
            },
            None => item,
        })
        .collect()
}

/// Bucket item indices by effective parent, each bucket sorted ascending by
/// raw timestamp. Ties keep their input order.
pub fn group_by_parent(items: &[WaterfallItem]) -> HashMap<ParentKey, Vec<usize>> {
    let known_ids: HashSet<&str> = items.iter().map(|item| item.id.as_str()).collect();

    let mut groups: HashMap<ParentKey, Vec<usize>> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        let key = match &item.parent {
            ParentKey::Id(id) if known_ids.contains(id.as_str()) => item.parent.clone(),
            _ => ParentKey::Root,
        };
        groups.entry(key).or_default().push(index);
    }

    for bucket in groups.values_mut() {
        bucket.sort_by_key(|&index| items[index].timestamp_micros);
    }

    groups
}

/// Timing of the parent an item was reached from
#[derive(Debug, Clone, Copy)]
struct ParentTiming {
    timestamp_micros: i64,
    duration_micros: i64,
    skew_micros: i64,
}

impl From<&WaterfallItem> for ParentTiming {
    fn from(item: &WaterfallItem) -> Self {
        Self {
            timestamp_micros: item.timestamp_micros,
            duration_micros: item.duration_micros,
            skew_micros: item.skew_micros,
        }
    }
}

/// Clock skew correction for an item reached from `parent`.
///
/// Spans and errors run in their parent's process and share its clock.
/// A transaction that appears to start before the call that caused it is
/// shifted to the parent's start plus half of the unexplained latency.
fn clock_skew(doc_type: DocType, timestamp_micros: i64, duration_micros: i64, parent: Option<ParentTiming>) -> i64 {
    let Some(parent) = parent else {
        return 0;
    };

    match doc_type {
        DocType::Span | DocType::Error => parent.skew_micros,
        DocType::Transaction => {
            let parent_start = parent.timestamp_micros.saturating_add(parent.skew_micros);
            let offset_start = parent_start.saturating_sub(timestamp_micros);
            if offset_start > 0 {
                let latency = parent.duration_micros.saturating_sub(duration_micros).max(0) / 2;
                offset_start.saturating_add(latency)
            } else {
                0
            }
        }
    }
}

/// Offset and skew for an item hanging off `parent` in a waterfall whose
/// entry started at `entry_timestamp`
pub(crate) fn place_item(item: WaterfallItem, entry_timestamp: i64, parent: Option<&WaterfallItem>) -> WaterfallItem {
    let skew_micros = clock_skew(
        item.doc_type,
        item.timestamp_micros,
        item.duration_micros,
        parent.map(ParentTiming::from),
    );
    WaterfallItem {
        offset_micros: item.timestamp_micros.saturating_sub(entry_timestamp),
        skew_micros,
        ..item
    }
}

/// Result of walking the tree below the entry transaction
#[derive(Debug, Default)]
pub struct OrderedTree {
    /// Items in pre-order, offset and skew applied
    pub items: Vec<WaterfallItem>,
    /// Edges actually walked, as indices into `items`. The entry is filed
    /// under `Root`.
    pub children_by_parent_id: HashMap<ParentKey, Vec<usize>>,
}

/// Depth-first walk from the entry item computing offsets, clock skew and a
/// stable top-down order.
///
/// Ids already placed are not visited again, so cyclic parent graphs are
/// truncated instead of looping.
pub fn order_items(
    items: &[WaterfallItem],
    groups: &HashMap<ParentKey, Vec<usize>>,
    entry_index: usize,
) -> OrderedTree {
    let entry_timestamp = items[entry_index].timestamp_micros;
    let mut walk = TreeWalk {
        items,
        groups,
        entry_timestamp,
        visited: HashSet::new(),
        ordered: OrderedTree::default(),
    };
    walk.visit(entry_index, None);
    walk.ordered
}

struct TreeWalk<'a> {
    items: &'a [WaterfallItem],
    groups: &'a HashMap<ParentKey, Vec<usize>>,
    entry_timestamp: i64,
    visited: HashSet<&'a str>,
    ordered: OrderedTree,
}

impl<'a> TreeWalk<'a> {
    fn visit(&mut self, index: usize, parent: Option<usize>) {
        let items = self.items;
        let source = &items[index];
        if !self.visited.insert(source.id.as_str()) {
            return;
        }

        let placed = place_item(
            source.clone(),
            self.entry_timestamp,
            parent.map(|p| &self.ordered.items[p]),
        );
        let position = self.ordered.items.len();
        self.ordered.items.push(placed);

        let bucket = match parent {
            Some(p) => ParentKey::Id(self.ordered.items[p].id.clone()),
            None => ParentKey::Root,
        };
        self.ordered
            .children_by_parent_id
            .entry(bucket)
            .or_default()
            .push(position);

        let groups = self.groups;
        if let Some(children) = groups.get(&ParentKey::Id(source.id.clone())) {
            for &child in children {
                self.visit(child, Some(position));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{RawDocument, SpanDoc, TransactionDoc};
    use std::sync::Arc;

    fn transaction(id: &str, parent: Option<&str>, ts: i64, duration: i64) -> WaterfallItem {
        let doc = RawDocument::Transaction(TransactionDoc {
            id: id.into(),
            trace_id: None,
            parent_id: parent.map(String::from),
            name: id.into(),
            service_name: "svc".into(),
            timestamp_micros: ts,
            duration_micros: duration,
            links: Vec::new(),
        });
        WaterfallItem::from_document(Arc::new(doc), &HashMap::new())
    }

    fn span(id: &str, parent: Option<&str>, ts: i64, duration: i64, child_ids: &[&str]) -> WaterfallItem {
        let doc = RawDocument::Span(SpanDoc {
            id: id.into(),
            trace_id: None,
            parent_id: parent.map(String::from),
            name: id.into(),
            service_name: "svc".into(),
            timestamp_micros: ts,
            duration_micros: duration,
            span_type: "app".into(),
            span_subtype: None,
            links: Vec::new(),
            child_ids: child_ids.iter().map(|c| c.to_string()).collect(),
        });
        WaterfallItem::from_document(Arc::new(doc), &HashMap::new())
    }

    fn ids(items: &[WaterfallItem]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn reparenting_overrides_declared_parent() {
        let items = reparent_spans(vec![
            transaction("t1", None, 0, 100),
            span("a", Some("t1"), 10, 50, &["b"]),
            span("b", Some("t1"), 20, 10, &[]),
            span("c", Some("t1"), 30, 10, &[]),
        ]);

        assert_eq!(items[2].parent, ParentKey::Id("a".into()));
        assert_eq!(items[3].parent, ParentKey::Id("t1".into()));
    }

    #[test]
    fn grouping_sorts_by_timestamp_and_roots_dangling_parents() {
        let items = vec![
            transaction("t1", None, 0, 100),
            span("late", Some("t1"), 50, 1, &[]),
            span("early", Some("t1"), 10, 1, &[]),
            span("tie", Some("t1"), 10, 1, &[]),
            span("orphan", Some("missing"), 5, 1, &[]),
        ];
        let groups = group_by_parent(&items);

        assert_eq!(groups[&ParentKey::Id("t1".into())], vec![2, 3, 1]);
        assert_eq!(groups[&ParentKey::Root], vec![0, 4]);
        assert!(!groups.contains_key(&ParentKey::Id("missing".into())));
    }

    #[test]
    fn walk_computes_offsets_in_pre_order() {
        let items = vec![
            span("s2", Some("t1"), 1_000_300, 10, &[]),
            transaction("t1", None, 1_000_000, 500_000),
            span("s1", Some("t1"), 1_000_100, 100_000, &[]),
            span("s1a", Some("s1"), 1_000_150, 10, &[]),
        ];
        let groups = group_by_parent(&items);
        let tree = order_items(&items, &groups, 1);

        assert_eq!(ids(&tree.items), vec!["t1", "s1", "s1a", "s2"]);
        assert_eq!(tree.items[0].offset_micros, 0);
        assert_eq!(tree.items[1].offset_micros, 100);
        assert_eq!(tree.items[3].offset_micros, 300);
        assert_eq!(tree.children_by_parent_id[&ParentKey::Root], vec![0]);
        assert_eq!(tree.children_by_parent_id[&ParentKey::Id("t1".into())], vec![1, 3]);
    }

    #[test]
    fn transaction_starting_before_parent_is_skewed() {
        let items = vec![
            transaction("t1", None, 1_000_000, 300_000),
            transaction("t2", Some("t1"), 999_000, 250_000),
            span("s", Some("t2"), 999_500, 1_000, &[]),
        ];
        let groups = group_by_parent(&items);
        let tree = order_items(&items, &groups, 0);

        let t2 = &tree.items[1];
        assert_eq!(t2.offset_micros, -1_000);
        assert_eq!(t2.skew_micros, 26_000);
        assert_eq!(t2.rendered_start(), 25_000);
        assert_eq!(tree.items[2].skew_micros, 26_000);
    }

    #[test]
    fn transaction_starting_after_parent_has_no_skew() {
        let items = vec![
            transaction("t1", None, 1_000, 300),
            transaction("t2", Some("t1"), 1_100, 100),
        ];
        let groups = group_by_parent(&items);
        let tree = order_items(&items, &groups, 0);
        assert_eq!(tree.items[1].skew_micros, 0);
    }

    #[test]
    fn cyclic_parents_do_not_recurse_forever() {
        let items = vec![
            transaction("t1", Some("b"), 0, 100),
            span("a", Some("t1"), 1, 10, &[]),
            span("b", Some("a"), 2, 10, &[]),
        ];
        let groups = group_by_parent(&items);
        let tree = order_items(&items, &groups, 0);

        assert_eq!(ids(&tree.items), vec!["t1", "a", "b"]);
        assert!(!tree.children_by_parent_id.contains_key(&ParentKey::Id("b".into())));
    }

    #[test]
    fn duplicate_ids_are_placed_once() {
        let items = vec![
            transaction("t1", None, 0, 100),
            span("s", Some("t1"), 1, 10, &[]),
            span("s", Some("t1"), 2, 10, &[]),
        ];
        let groups = group_by_parent(&items);
        let tree = order_items(&items, &groups, 0);
        assert_eq!(ids(&tree.items), vec!["t1", "s"]);
    }

    #[test]
    fn empty_span_id_declares_no_children() {
        let items = reparent_spans(vec![
            transaction("t1", None, 0, 100),
            span("", Some("t1"), 10, 50, &["b"]),
            span("b", Some("t1"), 20, 10, &[]),
        ]);
        assert_eq!(items[2].parent, ParentKey::Id("t1".into()));
    }
}

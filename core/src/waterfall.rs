use crate::critical_path::{critical_path, CriticalPath};
use crate::document::{DocType, RawDocument, SpanLink};
use crate::error_events::{attach_errors, count_errors_by_parent};
use crate::item::{count_incoming_links, ParentKey, WaterfallItem};
use crate::legend::{apply_colors, build_legends, Legend, LegendType};
use crate::tree::{group_by_parent, order_items, reparent_spans};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Everything a waterfall is built from. Bookkeeping fields are carried into
/// the result untouched.
#[derive(Debug, Clone, Default)]
pub struct WaterfallInput {
    pub entry_transaction_id: String,
    pub documents: Vec<RawDocument>,
    pub trace_id: Option<String>,
    pub root_links: Vec<SpanLink>,
    pub exceeds_max: bool,
    pub trace_docs_total: usize,
}

impl WaterfallInput {
    pub fn new(entry_transaction_id: impl Into<String>, documents: Vec<RawDocument>) -> Self {
        let trace_docs_total = documents.len();
        Self {
            entry_transaction_id: entry_transaction_id.into(),
            documents,
            trace_docs_total,
            ..Default::default()
        }
    }
}

/// Render-ready reconstruction of a trace below its entry transaction.
///
/// Rebuilt from scratch for every query and never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Waterfall {
    pub trace_id: Option<String>,
    pub root_links: Vec<SpanLink>,
    pub exceeds_max: bool,
    pub trace_docs_total: usize,

    /// Pre-order, entry transaction first
    pub items: Vec<WaterfallItem>,
    /// Walked edges as indices into `items`, each list in timestamp order
    pub children_by_parent_id: HashMap<ParentKey, Vec<usize>>,
    pub error_items: Vec<WaterfallItem>,
    pub error_count_by_parent_id: HashMap<String, usize>,
    pub legends: Vec<Legend>,
    pub color_by: LegendType,
    pub total_duration_micros: i64,
    /// First transaction without a parent in the document set, if any
    pub root_transaction_id: Option<String>,
    /// Transactions and spans whose parent is missing from the document set
    pub orphan_items_count: usize,
}

impl Waterfall {
    fn empty(input: WaterfallInput) -> Self {
        Self {
            trace_id: input.trace_id,
            root_links: input.root_links,
            exceeds_max: input.exceeds_max,
            trace_docs_total: input.trace_docs_total,
            ..Default::default()
        }
    }

    pub fn entry_item(&self) -> Option<&WaterfallItem> {
        self.items.first()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get_error_count(&self, parent_id: &str) -> usize {
        self.error_count_by_parent_id
            .get(parent_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn item_index(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn item(&self, id: &str) -> Option<&WaterfallItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn children_of(&self, id: &str) -> impl Iterator<Item = &WaterfallItem> {
        self.children_by_parent_id
            .get(&ParentKey::Id(id.to_string()))
            .into_iter()
            .flatten()
            .map(|&index| &self.items[index])
    }

    /// Depth of each item below the entry, indexed like `items`
    pub fn depths(&self) -> Vec<usize> {
        let mut depths = vec![0; self.items.len()];
        for (index, item) in self.items.iter().enumerate() {
            for &child in self
                .children_by_parent_id
                .get(&ParentKey::Id(item.id.clone()))
                .into_iter()
                .flatten()
            {
                depths[child] = depths[index] + 1;
            }
        }
        depths
    }

    pub fn critical_path(&self) -> CriticalPath {
        critical_path(self)
    }
}

/// Build the waterfall for `input.entry_transaction_id`.
///
/// No documents, or an entry id that does not name a transaction, yields the
/// empty waterfall; this is not an error.
pub fn build_waterfall(input: WaterfallInput) -> Waterfall {
    if input.documents.is_empty() {
        tracing::debug!("No documents for trace {:?}", input.trace_id);
        return Waterfall::empty(input);
    }

    let mut input = input;
    let documents: Vec<Arc<RawDocument>> = std::mem::take(&mut input.documents)
        .into_iter()
        .map(Arc::new)
        .collect();

    let incoming_links = count_incoming_links(documents.iter().map(|document| &**document));

    let (trace_documents, error_documents): (Vec<_>, Vec<_>) = documents
        .into_iter()
        .partition(|document| document.doc_type() != DocType::Error);

    let trace_items: Vec<WaterfallItem> = trace_documents
        .into_iter()
        .map(|document| WaterfallItem::from_document(document, &incoming_links))
        .collect();
    let trace_items = reparent_spans(trace_items);

    let Some(entry_index) = trace_items.iter().position(|item| {
        item.doc_type == DocType::Transaction && item.id == input.entry_transaction_id
    }) else {
        tracing::debug!(
            "Entry transaction {} not found among {} document(s)",
            input.entry_transaction_id,
            trace_items.len()
        );
        return Waterfall::empty(input);
    };

    let groups = group_by_parent(&trace_items);
    let root_transaction_id = groups
        .get(&ParentKey::Root)
        .and_then(|bucket| bucket.first())
        .map(|&index| &trace_items[index])
        .filter(|item| item.doc_type == DocType::Transaction && item.parent == ParentKey::Root)
        .map(|item| item.id.clone());
    let orphan_items_count = count_orphans(&trace_items);

    let tree = order_items(&trace_items, &groups, entry_index);

    let error_items: Vec<WaterfallItem> = error_documents
        .into_iter()
        .map(|document| WaterfallItem::from_document(document, &incoming_links))
        .collect();
    let error_count_by_parent_id = count_errors_by_parent(&error_items);
    let error_items = attach_errors(error_items, &tree.items);

    let (color_by, legends) = build_legends(&tree.items);
    let items = apply_colors(tree.items, color_by, &legends);

    let total_duration_micros = items
        .iter()
        .map(WaterfallItem::rendered_end)
        .max()
        .unwrap_or(0);

    tracing::debug!(
        "Built waterfall for {}: {} item(s), {} error(s), {} legend(s), {}µs",
        input.entry_transaction_id,
        items.len(),
        error_items.len(),
        legends.len(),
        total_duration_micros
    );

    Waterfall {
        trace_id: input.trace_id,
        root_links: input.root_links,
        exceeds_max: input.exceeds_max,
        trace_docs_total: input.trace_docs_total,
        items,
        children_by_parent_id: tree.children_by_parent_id,
        error_items,
        error_count_by_parent_id,
        legends,
        color_by,
        total_duration_micros,
        root_transaction_id,
        orphan_items_count,
    }
}

fn count_orphans(items: &[WaterfallItem]) -> usize {
    let ids: HashSet<&str> = items.iter().map(|item| item.id.as_str()).collect();
    items
        .iter()
        .filter(|item| matches!(item.parent.id(), Some(parent) if !ids.contains(parent)))
        .count()
}

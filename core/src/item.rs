use crate::document::{DocType, RawDocument};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Effective parent of an item. Parentless items, and items whose parent is
/// not part of the document set, are grouped under `Root`.
///
/// `Root` serializes as the empty string. An empty id never becomes a
/// parent, so the key cannot collide with a real one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum ParentKey {
    Root,
    Id(String),
}

impl ParentKey {
    pub fn from_parent_id(parent_id: Option<&str>) -> Self {
        match parent_id {
            Some(id) if !id.is_empty() => ParentKey::Id(id.to_string()),
            _ => ParentKey::Root,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            ParentKey::Root => None,
            ParentKey::Id(id) => Some(id),
        }
    }
}

impl fmt::Display for ParentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentKey::Root => f.write_str("root"),
            ParentKey::Id(id) => f.write_str(id),
        }
    }
}

impl From<ParentKey> for String {
    fn from(key: ParentKey) -> Self {
        match key {
            ParentKey::Root => String::new(),
            ParentKey::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpanLinksCount {
    /// Outgoing links to spans in other traces
    pub linked_parents: usize,
    /// Links from other documents naming this item
    pub linked_children: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegendValues {
    pub service_name: String,
    /// Span type for spans, empty for transactions and errors
    pub span_type: String,
}

/// One row of the waterfall
#[derive(Debug, Clone, Serialize)]
pub struct WaterfallItem {
    pub doc_type: DocType,
    pub id: String,
    pub parent: ParentKey,
    pub name: String,
    pub service_name: String,
    pub timestamp_micros: i64,
    pub duration_micros: i64,
    /// Raw start relative to the entry transaction's timestamp
    pub offset_micros: i64,
    pub skew_micros: i64,
    pub legend_values: LegendValues,
    pub color: Option<String>,
    pub span_links_count: SpanLinksCount,
    #[serde(skip)]
    pub document: Arc<RawDocument>,
}

impl WaterfallItem {
    /// Normalize a raw document. Offset, skew and color are filled in later
    /// stages; absent fields have already defaulted to zero or empty.
    pub fn from_document(document: Arc<RawDocument>, incoming_links: &HashMap<String, usize>) -> Self {
        let id = document.id().to_string();
        let linked_children = incoming_links.get(&id).copied().unwrap_or(0);

        Self {
            doc_type: document.doc_type(),
            parent: ParentKey::from_parent_id(document.parent_id()),
            name: document.name().to_string(),
            service_name: document.service_name().to_string(),
            timestamp_micros: document.timestamp_micros(),
            duration_micros: document.duration_micros().max(0),
            offset_micros: 0,
            skew_micros: 0,
            legend_values: LegendValues {
                service_name: document.service_name().to_string(),
                span_type: document.span_type().unwrap_or_default().to_string(),
            },
            color: None,
            span_links_count: SpanLinksCount {
                linked_parents: document.links().len(),
                linked_children,
            },
            id,
            document,
        }
    }

    /// Visual start: raw offset corrected for clock skew. Extreme document
    /// values saturate at the i64 bounds.
    pub fn rendered_start(&self) -> i64 {
        self.offset_micros.saturating_add(self.skew_micros)
    }

    pub fn rendered_end(&self) -> i64 {
        self.rendered_start().saturating_add(self.duration_micros)
    }
}

/// Count incoming span links per target span id across the whole result set.
///
/// A document linking to itself is not counted.
pub fn count_incoming_links<'a, I>(documents: I) -> HashMap<String, usize>
where
    I: IntoIterator<Item = &'a RawDocument>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for document in documents {
        for link in document.links() {
            if link.span_id == document.id() {
                continue;
            }
            *counts.entry(link.span_id.clone()).or_insert(0) += 1;
        }
    }
    counts
}

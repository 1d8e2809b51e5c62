use crate::document::RawDocument;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// One page request against a tracing index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub trace_id: String,
    /// Opaque cursor from the previous page, `None` for the first page
    pub cursor: Option<String>,
    pub size: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentPage {
    pub documents: Vec<RawDocument>,
    pub next_cursor: Option<String>,
}

/// Anything that can hand out the documents of a trace page by page
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<DocumentPage>;
}

/// In-memory document source keyed by trace id.
///
/// Cursors are start offsets into the stored document list.
#[derive(Default)]
pub struct MemorySource {
    traces: DashMap<String, Vec<RawDocument>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append documents to a trace
    pub fn insert_documents(&self, trace_id: impl Into<String>, documents: Vec<RawDocument>) {
        self.traces
            .entry(trace_id.into())
            .or_default()
            .extend(documents);
    }

    pub fn count_documents(&self, trace_id: &str) -> usize {
        self.traces.get(trace_id).map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn clear(&self) {
        self.traces.clear();
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<DocumentPage> {
        let start = match &request.cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("Invalid cursor '{}': {}", cursor, e))?,
            None => 0,
        };

        let Some(documents) = self.traces.get(&request.trace_id) else {
            return Ok(DocumentPage::default());
        };

        let end = start.saturating_add(request.size).min(documents.len());
        let page: Vec<RawDocument> = documents
            .get(start..end)
            .map(<[RawDocument]>::to_vec)
            .unwrap_or_default();
        let next_cursor = (end < documents.len()).then(|| end.to_string());

        Ok(DocumentPage {
            documents: page,
            next_cursor,
        })
    }
}

use crate::config::LoaderConfig;
use crate::document::RawDocument;
use crate::error::{WaterfallError, WaterfallResult};
use crate::source::{DocumentSource, PageRequest};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Documents of one trace as accumulated by the loader
#[derive(Debug, Clone, Default)]
pub struct LoadedTrace {
    pub trace_id: String,
    pub documents: Vec<RawDocument>,
    /// The ceiling was reached on a full page, so more documents may exist
    pub exceeds_max: bool,
    pub pages: usize,
}

/// Cursor-based page accumulator.
///
/// Each call to [`TraceLoader::load`] supersedes every load still in flight:
/// those stop at their next page boundary with
/// [`WaterfallError::Superseded`].
pub struct TraceLoader {
    source: Arc<dyn DocumentSource>,
    config: LoaderConfig,
    generation: AtomicU64,
}

impl TraceLoader {
    pub fn new(source: Arc<dyn DocumentSource>, config: LoaderConfig) -> WaterfallResult<Self> {
        if config.page_size == 0 || config.max_trace_items == 0 {
            return Err(WaterfallError::InvalidConfig(
                "page_size and max_trace_items must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            source,
            config,
            generation: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Stop every load currently in flight without starting a new one
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Fetch pages until a short page, the last cursor, or the item ceiling.
    pub async fn load(&self, trace_id: &str) -> WaterfallResult<LoadedTrace> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let max_items = self.config.max_trace_items;

        let mut loaded = LoadedTrace {
            trace_id: trace_id.to_string(),
            ..Default::default()
        };
        let mut cursor: Option<String> = None;

        loop {
            if !self.is_current(generation) {
                return Err(self.superseded(trace_id));
            }

            let size = self.config.page_size.min(max_items - loaded.documents.len());
            let request = PageRequest {
                trace_id: trace_id.to_string(),
                cursor: cursor.take(),
                size,
            };

            let page = self
                .source
                .fetch_page(&request)
                .await
                .map_err(WaterfallError::Source)?;

            if !self.is_current(generation) {
                return Err(self.superseded(trace_id));
            }

            let fetched = page.documents.len();
            loaded.pages += 1;
            loaded.documents.extend(page.documents);
            tracing::debug!(
                "Fetched page {} of trace {}: {} document(s), {} total",
                loaded.pages,
                trace_id,
                fetched,
                loaded.documents.len()
            );

            if loaded.documents.len() >= max_items {
                loaded.documents.truncate(max_items);
                loaded.exceeds_max = fetched >= size && page.next_cursor.is_some();
                if loaded.exceeds_max {
                    tracing::warn!(
                        "Trace {} exceeds the ceiling of {} documents; waterfall will be partial",
                        trace_id,
                        max_items
                    );
                }
                break;
            }

            if fetched < size {
                break;
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(loaded)
    }

    fn superseded(&self, trace_id: &str) -> WaterfallError {
        tracing::debug!("Load of trace {} superseded", trace_id);
        WaterfallError::Superseded {
            trace_id: trace_id.to_string(),
        }
    }
}

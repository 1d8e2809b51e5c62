use crate::config::Config;
use crate::document::SpanLink;
use crate::error::WaterfallResult;
use crate::format::DurationFormatter;
use crate::loader::TraceLoader;
use crate::source::DocumentSource;
use crate::waterfall::{build_waterfall, Waterfall, WaterfallInput};
use std::sync::Arc;

/// What the trace explorer asks for
#[derive(Debug, Clone, Default)]
pub struct TraceQuery {
    pub trace_id: String,
    pub entry_transaction_id: String,
    /// Links of the trace root, carried through untouched
    pub root_links: Vec<SpanLink>,
}

impl TraceQuery {
    pub fn new(trace_id: impl Into<String>, entry_transaction_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            entry_transaction_id: entry_transaction_id.into(),
            root_links: Vec::new(),
        }
    }
}

/// WaterfallService coordinates between a document source and the waterfall
/// build. Loading is async and cancellable; the build runs to completion once
/// the documents are in.
pub struct WaterfallService {
    loader: TraceLoader,
    config: Config,
}

impl WaterfallService {
    pub fn new(source: Arc<dyn DocumentSource>, config: Config) -> WaterfallResult<Self> {
        let loader = TraceLoader::new(source, config.loader.clone())?;
        Ok(Self { loader, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the trace and rebuild its waterfall from scratch
    pub async fn get_waterfall(&self, query: TraceQuery) -> WaterfallResult<Waterfall> {
        let loaded = self.loader.load(&query.trace_id).await?;

        let input = WaterfallInput {
            entry_transaction_id: query.entry_transaction_id,
            trace_docs_total: loaded.documents.len(),
            documents: loaded.documents,
            trace_id: Some(query.trace_id),
            root_links: query.root_links,
            exceeds_max: loaded.exceeds_max,
        };

        Ok(build_waterfall(input))
    }

    /// Abandon any load in flight
    pub fn cancel(&self) {
        self.loader.cancel();
    }

    /// Formatter sized for `waterfall`'s longest duration
    pub fn duration_formatter(&self, waterfall: &Waterfall) -> DurationFormatter {
        DurationFormatter::new(waterfall.total_duration_micros, &self.config.format)
    }
}

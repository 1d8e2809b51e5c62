use crate::fixtures::TraceFixture;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use waterline_core::source::{DocumentPage, PageRequest};
use waterline_core::{
    Config, DocumentSource, MemorySource, TraceQuery, Waterfall, WaterfallResult,
    WaterfallService,
};

/// Memory source seeded from fixtures, with every page request recorded
#[derive(Default)]
pub struct RecordingSource {
    inner: MemorySource,
    requests: Mutex<Vec<PageRequest>>,
}

impl RecordingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixture(fixture: &TraceFixture) -> Self {
        let source = Self::new();
        source
            .inner
            .insert_documents(fixture.trace_id.clone(), fixture.documents.clone());
        source
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentSource for RecordingSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<DocumentPage> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.inner.fetch_page(request).await
    }
}

/// Source that parks every page request until the test releases it.
///
/// `entered` gains a permit per request as soon as it arrives, so a test can
/// act while a load is known to be suspended inside the source. Releases are
/// counted and never lost, whichever side gets there first.
pub struct GatedSource {
    inner: MemorySource,
    entered: Semaphore,
    release: Semaphore,
    pending: AtomicUsize,
}

impl GatedSource {
    pub fn with_fixture(fixture: &TraceFixture) -> Self {
        let inner = MemorySource::new();
        inner.insert_documents(fixture.trace_id.clone(), fixture.documents.clone());
        Self {
            inner,
            entered: Semaphore::new(0),
            release: Semaphore::new(0),
            pending: AtomicUsize::new(0),
        }
    }

    /// Wait until a request is parked in the source
    pub async fn wait_entered(&self) {
        if let Ok(permit) = self.entered.acquire().await {
            permit.forget();
        }
    }

    /// Let one parked (or the next) request through
    pub fn release_one(&self) {
        self.release.add_permits(1);
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for GatedSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<DocumentPage> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.entered.add_permits(1);
        self.release.acquire().await?.forget();
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.inner.fetch_page(request).await
    }
}

/// Service over an in-memory copy of `fixture`
pub struct TestApp {
    pub service: WaterfallService,
    pub fixture: TraceFixture,
}

impl TestApp {
    pub fn new(fixture: TraceFixture, config: Config) -> Result<Self> {
        let source = MemorySource::new();
        source.insert_documents(fixture.trace_id.clone(), fixture.documents.clone());
        let service = WaterfallService::new(Arc::new(source), config)?;
        Ok(Self { service, fixture })
    }

    pub async fn waterfall(&self) -> WaterfallResult<Waterfall> {
        self.service
            .get_waterfall(TraceQuery::new(
                self.fixture.trace_id.clone(),
                self.fixture.entry_transaction_id.clone(),
            ))
            .await
    }
}

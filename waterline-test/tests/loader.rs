use anyhow::Result;
use std::sync::Arc;
use waterline_core::config::LoaderConfig;
use waterline_core::{Config, TraceQuery, WaterfallError, WaterfallService};
use waterline_test::fixtures::{single_service_fixture, wide_fixture};
use waterline_test::harness::{GatedSource, RecordingSource};

fn config(page_size: usize, max_trace_items: usize) -> Config {
    Config {
        loader: LoaderConfig {
            max_trace_items,
            page_size,
        },
        ..Config::default()
    }
}

#[tokio::test]
async fn pages_are_requested_with_cursors() -> Result<()> {
    let fixture = wide_fixture(24);
    let source = Arc::new(RecordingSource::with_fixture(&fixture));
    let service = WaterfallService::new(source.clone(), config(10, 100))?;

    let waterfall = service
        .get_waterfall(TraceQuery::new(&fixture.trace_id, &fixture.entry_transaction_id))
        .await?;

    assert_eq!(waterfall.items.len(), 25);
    assert!(!waterfall.exceeds_max);

    let cursors: Vec<Option<String>> = source.requests().into_iter().map(|r| r.cursor).collect();
    assert_eq!(cursors, vec![None, Some("10".to_string()), Some("20".to_string())]);
    Ok(())
}

#[tokio::test]
async fn ceiling_yields_a_partial_waterfall() -> Result<()> {
    let fixture = wide_fixture(40);
    let source = Arc::new(RecordingSource::with_fixture(&fixture));
    let service = WaterfallService::new(source.clone(), config(10, 15))?;

    let waterfall = service
        .get_waterfall(TraceQuery::new(&fixture.trace_id, &fixture.entry_transaction_id))
        .await?;

    assert!(waterfall.exceeds_max);
    assert_eq!(waterfall.trace_docs_total, 15);
    assert_eq!(waterfall.items.len(), 15);

    let sizes: Vec<usize> = source.requests().into_iter().map(|r| r.size).collect();
    assert_eq!(sizes, vec![10, 5]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn newer_load_supersedes_one_in_flight() -> Result<()> {
    let fixture = single_service_fixture();
    let source = Arc::new(GatedSource::with_fixture(&fixture));
    let service = Arc::new(WaterfallService::new(source.clone(), Config::default())?);
    let query = TraceQuery::new(&fixture.trace_id, &fixture.entry_transaction_id);

    let first = tokio::spawn({
        let service = Arc::clone(&service);
        let query = query.clone();
        async move { service.get_waterfall(query).await }
    });
    source.wait_entered().await;

    let second = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.get_waterfall(query).await }
    });
    source.wait_entered().await;
    assert_eq!(source.pending(), 2);

    source.release_one();
    source.release_one();

    let first = first.await?;
    assert!(matches!(first, Err(WaterfallError::Superseded { .. })));

    let second = second.await??;
    assert_eq!(second.items.len(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_abandons_the_load() -> Result<()> {
    let fixture = single_service_fixture();
    let source = Arc::new(GatedSource::with_fixture(&fixture));
    let service = Arc::new(WaterfallService::new(source.clone(), Config::default())?);

    let load = tokio::spawn({
        let service = Arc::clone(&service);
        let query = TraceQuery::new(&fixture.trace_id, &fixture.entry_transaction_id);
        async move { service.get_waterfall(query).await }
    });
    source.wait_entered().await;

    service.cancel();
    source.release_one();

    assert!(matches!(load.await?, Err(WaterfallError::Superseded { .. })));
    Ok(())
}

#[test]
fn zero_page_size_is_rejected() {
    let source = Arc::new(RecordingSource::new());
    let result = WaterfallService::new(source, config(0, 10));
    assert!(matches!(result, Err(WaterfallError::InvalidConfig(_))));
}

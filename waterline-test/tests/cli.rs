use anyhow::Result;
use std::sync::Arc;
use waterline::input::{parse_document_file, LOCAL_TRACE_ID};
use waterline::report::{render_critical_path, render_waterfall};
use waterline_core::{Config, MemorySource, TraceQuery, WaterfallService};

const INPUT: &str = r#"{
  "documents": [
    {"docType": "transaction", "id": "t1", "name": "GET /cart", "serviceName": "frontend",
     "timestampMicros": 0, "durationMicros": 200000},
    {"docType": "span", "id": "s1", "parentId": "t1", "name": "SELECT cart",
     "serviceName": "frontend", "spanType": "db", "timestampMicros": 20000,
     "durationMicros": 150000},
    {"docType": "error", "id": "e1", "parentId": "s1", "timestampMicros": 30000},
    {"docType": "metric", "id": "m1"}
  ]
}"#;

#[tokio::test]
async fn document_file_to_report() -> Result<()> {
    let file = parse_document_file(INPUT)?;
    assert_eq!(file.documents.len(), 3);
    assert_eq!(file.skipped, 1);
    assert_eq!(file.trace_id(), None);

    let source = MemorySource::new();
    source.insert_documents(LOCAL_TRACE_ID, file.documents);
    let service = WaterfallService::new(Arc::new(source), Config::default())?;

    let waterfall = service
        .get_waterfall(TraceQuery::new(LOCAL_TRACE_ID, "t1"))
        .await?;
    let formatter = service.duration_formatter(&waterfall);

    let text = render_waterfall(&waterfall, &formatter);
    assert!(text.starts_with("Trace local · entry t1 · total 200.0 ms"));
    assert!(text.contains("SELECT cart [1 error(s)]"));

    let path = render_critical_path(&waterfall, &waterfall.critical_path(), &formatter);
    let lines: Vec<&str> = path.lines().collect();
    assert!(lines[1].contains("150.0 ms"));
    assert!(lines[1].contains("SELECT cart"));
    assert!(lines[2].contains("50.0 ms"));
    Ok(())
}

#[tokio::test]
async fn unknown_entry_renders_a_notice() -> Result<()> {
    let file = parse_document_file(INPUT)?;
    let source = MemorySource::new();
    source.insert_documents(LOCAL_TRACE_ID, file.documents);
    let service = WaterfallService::new(Arc::new(source), Config::default())?;

    let waterfall = service
        .get_waterfall(TraceQuery::new(LOCAL_TRACE_ID, "missing"))
        .await?;
    let formatter = service.duration_formatter(&waterfall);

    assert!(render_waterfall(&waterfall, &formatter).starts_with("No waterfall"));
    assert!(render_critical_path(&waterfall, &waterfall.critical_path(), &formatter)
        .starts_with("No critical path"));
    Ok(())
}

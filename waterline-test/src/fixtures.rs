use serde_json::{json, Value};
use waterline_core::{parse_documents, RawDocument};

pub const TRACE_ID: &str = "4bf92f3577b34da6a3ce929d0e0e4736";

#[derive(Debug, Clone)]
pub struct TraceFixture {
    pub trace_id: String,
    pub entry_transaction_id: String,
    pub documents: Vec<RawDocument>,
}

impl TraceFixture {
    fn new(entry_transaction_id: &str, values: Vec<Value>) -> Self {
        let (documents, skipped) = parse_documents(values);
        assert!(skipped.is_empty(), "fixture documents must all classify");
        Self {
            trace_id: TRACE_ID.to_string(),
            entry_transaction_id: entry_transaction_id.to_string(),
            documents,
        }
    }
}

/// One transaction with one span, clocks in agreement
pub fn single_service_fixture() -> TraceFixture {
    TraceFixture::new(
        "t1",
        vec![
            json!({"docType": "transaction", "id": "t1", "name": "GET /checkout",
                   "serviceName": "frontend", "timestampMicros": 1_000_000,
                   "durationMicros": 500_000}),
            json!({"docType": "span", "id": "s1", "parentId": "t1", "name": "render",
                   "serviceName": "frontend", "spanType": "app",
                   "timestampMicros": 1_000_100, "durationMicros": 100_000}),
        ],
    )
}

/// Downstream transaction whose clock runs 1ms behind its caller
pub fn skewed_fixture() -> TraceFixture {
    TraceFixture::new(
        "t1",
        vec![
            json!({"docType": "transaction", "id": "t1", "name": "POST /orders",
                   "serviceName": "service-a", "timestampMicros": 1_000_000,
                   "durationMicros": 300_000}),
            json!({"docType": "transaction", "id": "t2", "parentId": "t1", "name": "reserve",
                   "serviceName": "service-b", "timestampMicros": 999_000,
                   "durationMicros": 250_000}),
            json!({"docType": "span", "id": "s2", "parentId": "t2", "name": "UPDATE stock",
                   "serviceName": "service-b", "spanType": "db",
                   "timestampMicros": 1_009_000, "durationMicros": 50_000}),
        ],
    )
}

/// Three services, errors at several depths, span links and a forward
/// `childIds` reference that overrides a child's declared parent.
///
/// ```text
/// t1 frontend            [0, 400ms]
///   s1 http              [10, 310ms]
///     t2 checkout        [20, 300ms]
///       s2 db            [30, 130ms]
///       s4 external      [170, 290ms]  childIds = [s3]
///         s3 cache       [180, 190ms]  parentId says s2
///   s5 render            [320, 390ms]
/// t9 unrelated root
/// ```
pub fn multi_service_fixture() -> TraceFixture {
    TraceFixture::new(
        "t1",
        vec![
            json!({"docType": "transaction", "id": "t1", "name": "GET /cart",
                   "serviceName": "frontend", "timestampMicros": 0,
                   "durationMicros": 400_000}),
            json!({"docType": "span", "id": "s1", "parentId": "t1", "name": "POST /checkout",
                   "serviceName": "frontend", "spanType": "external",
                   "timestampMicros": 10_000, "durationMicros": 300_000}),
            json!({"docType": "transaction", "id": "t2", "parentId": "s1", "name": "checkout",
                   "serviceName": "checkout", "timestampMicros": 20_000,
                   "durationMicros": 280_000,
                   "links": [{"traceId": "other-trace", "spanId": "x1"}]}),
            json!({"docType": "span", "id": "s2", "parentId": "t2", "name": "SELECT cart",
                   "serviceName": "checkout", "spanType": "db",
                   "timestampMicros": 30_000, "durationMicros": 100_000}),
            json!({"docType": "span", "id": "s3", "parentId": "s2", "name": "GET session",
                   "serviceName": "checkout", "spanType": "cache",
                   "timestampMicros": 180_000, "durationMicros": 10_000}),
            json!({"docType": "span", "id": "s4", "parentId": "t2", "name": "charge card",
                   "serviceName": "payments", "spanType": "external",
                   "timestampMicros": 170_000, "durationMicros": 120_000,
                   "childIds": ["s3"],
                   "links": [{"traceId": TRACE_ID, "spanId": "s2"}]}),
            json!({"docType": "span", "id": "s5", "parentId": "t1", "name": "render",
                   "serviceName": "frontend", "spanType": "app",
                   "timestampMicros": 320_000, "durationMicros": 70_000,
                   "links": [{"traceId": TRACE_ID, "spanId": "s5"}]}),
            json!({"docType": "transaction", "id": "t9", "name": "cron",
                   "serviceName": "scheduler", "timestampMicros": 5_000,
                   "durationMicros": 1_000}),
            json!({"docType": "error", "id": "e1", "parentId": "s4",
                   "serviceName": "payments", "timestampMicros": 200_000,
                   "message": "card declined"}),
            json!({"docType": "error", "id": "e2", "parentId": "s4",
                   "serviceName": "payments", "timestampMicros": 210_000}),
            json!({"docType": "error", "id": "e3", "parentId": "t1",
                   "serviceName": "frontend", "timestampMicros": 395_000}),
            json!({"docType": "error", "id": "e4", "parentId": "t9",
                   "serviceName": "scheduler", "timestampMicros": 5_500}),
            json!({"docType": "error", "id": "e5", "parentId": "missing",
                   "serviceName": "frontend", "timestampMicros": 1_000}),
        ],
    )
}

/// A duplicated span id whose second copy hangs below its own child
pub fn cyclic_fixture() -> TraceFixture {
    TraceFixture::new(
        "t1",
        vec![
            json!({"docType": "transaction", "id": "t1", "serviceName": "web",
                   "timestampMicros": 0, "durationMicros": 100_000}),
            json!({"docType": "span", "id": "a", "parentId": "t1", "serviceName": "web",
                   "timestampMicros": 10_000, "durationMicros": 50_000}),
            json!({"docType": "span", "id": "b", "parentId": "a", "serviceName": "web",
                   "timestampMicros": 20_000, "durationMicros": 20_000}),
            json!({"docType": "span", "id": "a", "parentId": "b", "serviceName": "web",
                   "timestampMicros": 25_000, "durationMicros": 5_000}),
        ],
    )
}

/// `count` flat spans below a single transaction, for paging tests
pub fn wide_fixture(count: usize) -> TraceFixture {
    let mut values = vec![json!({"docType": "transaction", "id": "t1", "serviceName": "web",
                                 "timestampMicros": 0, "durationMicros": 1_000_000})];
    values.extend((0..count).map(|i| {
        json!({"docType": "span", "id": format!("s{i}"), "parentId": "t1",
               "serviceName": "web", "spanType": "app",
               "timestampMicros": i as i64 * 10, "durationMicros": 5})
    }));
    TraceFixture::new("t1", values)
}

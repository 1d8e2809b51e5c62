use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Explicit `null` decodes like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Reference from a span or transaction to a span in another trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanLink {
    #[serde(default, deserialize_with = "null_as_default")]
    pub trace_id: String,
    pub span_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDoc {
    pub id: String,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub service_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp_micros: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration_micros: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<SpanLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanDoc {
    pub id: String,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub service_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp_micros: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration_micros: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub span_type: String,
    #[serde(default)]
    pub span_subtype: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<SpanLink>,
    /// Forward references to children whose own parent id points elsewhere
    #[serde(default, deserialize_with = "null_as_default")]
    pub child_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDoc {
    pub id: String,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub service_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp_micros: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub exception_type: Option<String>,
}

/// A document fetched from the tracing index, discriminated by `docType`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "docType", rename_all = "lowercase")]
pub enum RawDocument {
    Transaction(TransactionDoc),
    Span(SpanDoc),
    Error(ErrorDoc),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Transaction,
    Span,
    Error,
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DocType::Transaction => "transaction",
            DocType::Span => "span",
            DocType::Error => "error",
        };
        f.write_str(label)
    }
}

impl RawDocument {
    pub fn doc_type(&self) -> DocType {
        match self {
            RawDocument::Transaction(_) => DocType::Transaction,
            RawDocument::Span(_) => DocType::Span,
            RawDocument::Error(_) => DocType::Error,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            RawDocument::Transaction(doc) => &doc.id,
            RawDocument::Span(doc) => &doc.id,
            RawDocument::Error(doc) => &doc.id,
        }
    }

    pub fn trace_id(&self) -> Option<&str> {
        match self {
            RawDocument::Transaction(doc) => doc.trace_id.as_deref(),
            RawDocument::Span(doc) => doc.trace_id.as_deref(),
            RawDocument::Error(doc) => doc.trace_id.as_deref(),
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        let parent = match self {
            RawDocument::Transaction(doc) => doc.parent_id.as_deref(),
            RawDocument::Span(doc) => doc.parent_id.as_deref(),
            RawDocument::Error(doc) => doc.parent_id.as_deref(),
        };
        // An empty parent id is as good as none.
        parent.filter(|id| !id.is_empty())
    }

    pub fn name(&self) -> &str {
        match self {
            RawDocument::Transaction(doc) => &doc.name,
            RawDocument::Span(doc) => &doc.name,
            RawDocument::Error(doc) => doc
                .message
                .as_deref()
                .or(doc.exception_type.as_deref())
                .unwrap_or(""),
        }
    }

    pub fn service_name(&self) -> &str {
        match self {
            RawDocument::Transaction(doc) => &doc.service_name,
            RawDocument::Span(doc) => &doc.service_name,
            RawDocument::Error(doc) => &doc.service_name,
        }
    }

    pub fn timestamp_micros(&self) -> i64 {
        match self {
            RawDocument::Transaction(doc) => doc.timestamp_micros,
            RawDocument::Span(doc) => doc.timestamp_micros,
            RawDocument::Error(doc) => doc.timestamp_micros,
        }
    }

    /// Duration from the variant's own duration field; errors have none
    pub fn duration_micros(&self) -> i64 {
        match self {
            RawDocument::Transaction(doc) => doc.duration_micros,
            RawDocument::Span(doc) => doc.duration_micros,
            RawDocument::Error(_) => 0,
        }
    }

    pub fn span_type(&self) -> Option<&str> {
        match self {
            RawDocument::Span(doc) => Some(&doc.span_type),
            _ => None,
        }
    }

    pub fn links(&self) -> &[SpanLink] {
        match self {
            RawDocument::Transaction(doc) => &doc.links,
            RawDocument::Span(doc) => &doc.links,
            RawDocument::Error(_) => &[],
        }
    }

    pub fn child_ids(&self) -> &[String] {
        match self {
            RawDocument::Span(doc) => &doc.child_ids,
            _ => &[],
        }
    }
}

/// A value that could not be classified as a transaction, span or error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    pub index: usize,
    pub reason: String,
}

/// Classify JSON values into documents one at a time.
///
/// A value that fails to decode is reported in the second list and logged;
/// it never aborts the rest of the batch.
pub fn parse_documents(values: Vec<Value>) -> (Vec<RawDocument>, Vec<SkippedDocument>) {
    let mut documents = Vec::with_capacity(values.len());
    let mut skipped = Vec::new();

    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<RawDocument>(value) {
            Ok(document) => documents.push(document),
            Err(e) => {
                tracing::warn!("Skipping unclassifiable document #{}: {}", index, e);
                skipped.push(SkippedDocument {
                    index,
                    reason: e.to_string(),
                });
            }
        }
    }

    (documents, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_each_variant_by_doc_type() {
        let (documents, skipped) = parse_documents(vec![
            json!({"docType": "transaction", "id": "t1", "serviceName": "web",
                   "timestampMicros": 10, "durationMicros": 5}),
            json!({"docType": "span", "id": "s1", "parentId": "t1", "spanType": "db",
                   "childIds": ["x"], "links": [{"traceId": "other", "spanId": "p"}]}),
            json!({"docType": "error", "id": "e1", "parentId": "s1", "message": "boom"}),
        ]);

        assert!(skipped.is_empty());
        let types: Vec<DocType> = documents.iter().map(RawDocument::doc_type).collect();
        assert_eq!(
            types,
            vec![DocType::Transaction, DocType::Span, DocType::Error]
        );
        assert_eq!(documents[1].child_ids(), &["x".to_string()]);
        assert_eq!(documents[1].links()[0].span_id, "p");
        assert_eq!(documents[2].name(), "boom");
    }

    #[test]
    fn absent_numeric_fields_default_to_zero() {
        let (documents, _) = parse_documents(vec![json!({"docType": "span", "id": "s1"})]);
        assert_eq!(documents[0].timestamp_micros(), 0);
        assert_eq!(documents[0].duration_micros(), 0);
        assert_eq!(documents[0].parent_id(), None);
        assert_eq!(documents[0].span_type(), Some(""));
    }

    #[test]
    fn unclassifiable_documents_are_skipped_not_fatal() {
        let (documents, skipped) = parse_documents(vec![
            json!({"docType": "metric", "id": "m1"}),
            json!({"id": "no-type"}),
            json!({"docType": "transaction", "id": "t1"}),
        ]);

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id(), "t1");
        assert_eq!(
            skipped.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 1]
        );
    }

    #[test]
    fn empty_parent_id_is_treated_as_missing() {
        let (documents, _) =
            parse_documents(vec![json!({"docType": "transaction", "id": "t1", "parentId": ""})]);
        assert_eq!(documents[0].parent_id(), None);
    }

    #[test]
    fn null_fields_decode_as_missing() {
        let (documents, skipped) = parse_documents(vec![
            json!({"docType": "transaction", "id": "t1", "name": null, "serviceName": null,
                   "timestampMicros": null, "durationMicros": null, "links": null}),
            json!({"docType": "span", "id": "s1", "parentId": "t1", "spanType": null,
                   "spanSubtype": null, "links": null, "childIds": null,
                   "durationMicros": null}),
            json!({"docType": "error", "id": "e1", "parentId": null, "message": null,
                   "timestampMicros": null}),
            json!({"docType": "span", "id": "s2", "links": [{"traceId": null, "spanId": "s1"}]}),
        ]);

        assert!(skipped.is_empty(), "{skipped:?}");
        assert_eq!(documents.len(), 4);
        assert_eq!(documents[0].duration_micros(), 0);
        assert_eq!(documents[0].name(), "");
        assert_eq!(documents[1].span_type(), Some(""));
        assert!(documents[1].links().is_empty());
        assert!(documents[1].child_ids().is_empty());
        assert_eq!(documents[2].parent_id(), None);
        assert_eq!(documents[3].links()[0].trace_id, "");
    }
}

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use waterline_core::document::{parse_documents, RawDocument};

/// Trace id used when neither the command line nor the documents name one
pub const LOCAL_TRACE_ID: &str = "local";

/// Documents read from a JSON file, with the number of values skipped
#[derive(Debug)]
pub struct DocumentFile {
    pub documents: Vec<RawDocument>,
    pub skipped: usize,
}

impl DocumentFile {
    /// First trace id carried by any document
    pub fn trace_id(&self) -> Option<&str> {
        self.documents.iter().find_map(RawDocument::trace_id)
    }
}

/// Accepts a JSON array of documents or an object with a `documents` array
pub fn parse_document_file(contents: &str) -> Result<DocumentFile> {
    let value: Value = serde_json::from_str(contents).context("Input is not valid JSON")?;

    let values = match value {
        Value::Array(values) => values,
        Value::Object(mut object) => match object.remove("documents") {
            Some(Value::Array(values)) => values,
            _ => anyhow::bail!("Expected a `documents` array in the input object"),
        },
        _ => anyhow::bail!("Expected a JSON array of documents"),
    };

    let (documents, skipped) = parse_documents(values);
    Ok(DocumentFile {
        documents,
        skipped: skipped.len(),
    })
}

pub fn read_document_file<P: AsRef<Path>>(path: P) -> Result<DocumentFile> {
    let contents = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read {:?}", path.as_ref()))?;
    parse_document_file(&contents)
}

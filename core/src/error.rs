use thiserror::Error;

/// Failures of the loading layer around the waterfall build.
///
/// Building a waterfall itself never fails; degenerate input produces an
/// empty waterfall instead.
#[derive(Debug, Error)]
pub enum WaterfallError {
    /// A newer load started while this one was still fetching pages
    #[error("Load of trace '{trace_id}' was superseded by a newer query")]
    Superseded { trace_id: String },

    /// The document source failed to return a page
    #[error("Document source failed: {0}")]
    Source(#[source] anyhow::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for loading operations.
pub type WaterfallResult<T> = Result<T, WaterfallError>;

pub mod config;
pub mod critical_path;
pub mod document;
pub mod error;
pub mod error_events;
pub mod format;
pub mod item;
pub mod legend;
pub mod loader;
pub mod service;
pub mod source;
pub mod tree;
pub mod waterfall;

pub use config::Config;
pub use critical_path::{critical_path, CriticalPath, CriticalPathSegment};
pub use document::{parse_documents, DocType, RawDocument, SpanLink};
pub use error::{WaterfallError, WaterfallResult};
pub use format::DurationFormatter;
pub use item::{ParentKey, WaterfallItem};
pub use loader::TraceLoader;
pub use service::{TraceQuery, WaterfallService};
pub use source::{DocumentSource, MemorySource};
pub use waterfall::{build_waterfall, Waterfall, WaterfallInput};

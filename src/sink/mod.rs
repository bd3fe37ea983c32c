//! Report sinks
//!
//! A sink durably records a completed report. Sinks perform blocking I/O
//! and are shared across request threads, so every implementation is
//! `Send + Sync` and serializes its own writes.

pub mod database;
pub mod file;
pub mod registry;

pub use database::DatabaseSink;
pub use file::{format_record, FileSink, RecordLine};
pub use registry::SinkRegistry;

use crate::context::ResolvedRequest;
use crate::error::SinkError;
use crate::report::Report;

/// Destination that records a completed report
pub trait Sink: Send + Sync {
    /// Stable name identifying the sink and its target
    fn name(&self) -> &str;

    /// Record the report; failures say whether retrying can help
    fn execute(&self, report: &Report, request: &ResolvedRequest) -> Result<(), SinkError>;
}

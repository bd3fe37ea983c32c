//! Shared sink instances keyed by target
//!
//! One physical target must be written through exactly one sink instance,
//! otherwise independently opened handles interleave partial writes. The
//! host owns a single registry and asks it for sinks instead of building
//! them directly.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{DatabaseSink, FileSink};
use crate::error::SinkError;

/// Lazily populated map from target to shared sink
#[derive(Default)]
pub struct SinkRegistry {
    files: Mutex<HashMap<PathBuf, Arc<FileSink>>>,
    databases: Mutex<HashMap<String, Arc<DatabaseSink>>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The file sink for `path`, created on first request
    pub fn file(&self, path: impl AsRef<Path>) -> Arc<FileSink> {
        let path = path.as_ref();
        let mut files = self.files.lock();

        Arc::clone(files.entry(path.to_path_buf()).or_insert_with(|| {
            debug!(path = %path.display(), "Created file sink");
            Arc::new(FileSink::new(path))
        }))
    }

    /// The database sink for `wrapper`, opened on first request
    ///
    /// Sinks are keyed by wrapper alone; a later request naming a
    /// different table gets the existing instance. A failed open is not
    /// cached, so the next request retries it.
    pub fn database(&self, wrapper: &str, table: &str) -> Result<Arc<DatabaseSink>, SinkError> {
        let mut databases = self.databases.lock();

        if let Some(sink) = databases.get(wrapper) {
            if sink.table() != table {
                warn!(
                    wrapper = wrapper,
                    requested_table = table,
                    table = sink.table(),
                    "Database sink already registered with another table"
                );
            }
            return Ok(Arc::clone(sink));
        }

        let sink = Arc::new(DatabaseSink::open(wrapper, table)?);
        databases.insert(wrapper.to_string(), Arc::clone(&sink));
        debug!(wrapper = wrapper, table = table, "Created database sink");

        Ok(sink)
    }

    /// Number of distinct targets with a live sink
    pub fn len(&self) -> usize {
        self.files.lock().len() + self.databases.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

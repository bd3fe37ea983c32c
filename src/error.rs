//! Error types
//!
//! Construction failures, per-sink failures and the aggregate dispatch
//! failure. Sink errors carry a classification so callers can tell a
//! misconfigured target apart from a transient I/O problem.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Broad classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The object being built is invalid; nothing shared was touched
    Construction,
    /// The sink target is misconfigured and will keep failing until fixed
    Configuration,
    /// The operation may succeed if the host retries it
    Transient,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Construction => write!(f, "construction"),
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::Transient => write!(f, "transient"),
        }
    }
}

/// Errors raised while building signatures and events
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("signature {id}: invalid pattern: {source}")]
    InvalidPattern {
        id: u32,
        #[source]
        source: regex::Error,
    },

    #[error("signature {id}: pattern is empty")]
    EmptyPattern { id: u32 },

    #[error("event '{name}' has no matched signatures")]
    NoMatchedSignatures { name: String },
}

impl SignatureError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Construction
    }
}

/// Failure of a single sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("log target {} does not exist", .0.display())]
    TargetMissing(PathBuf),

    #[error("log target {} is not writable", .0.display())]
    NotWritable(PathBuf),

    #[error("malformed log target: {0}")]
    MalformedTarget(String),

    #[error("write to {} failed: {source}", .target.display())]
    Write {
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl SinkError {
    /// Classify this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            SinkError::TargetMissing(_)
            | SinkError::NotWritable(_)
            | SinkError::MalformedTarget(_) => ErrorKind::Configuration,
            SinkError::Write { .. } | SinkError::Database(_) => ErrorKind::Transient,
        }
    }

    /// True when retrying without operator action cannot help
    pub fn is_permanent(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

/// Errors raised while reading back a durable record line
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("field {field} is not quoted")]
    Unquoted { field: &'static str },

    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("invalid impact: {0}")]
    Impact(#[from] std::num::ParseIntError),

    #[error("invalid percent-encoding: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("parameter '{0}' has no '='")]
    Parameter(String),
}

/// One failed sink within a dispatch
#[derive(Debug)]
pub struct SinkFailure {
    /// Name of the sink that failed
    pub sink: String,
    /// Why it failed
    pub error: SinkError,
}

/// Aggregate failure of a dispatch: at least one sink failed
#[derive(Debug, thiserror::Error)]
#[error(
    "{} of {} sink(s) failed: {}",
    .failures.len(),
    .failures.len() + .succeeded.len(),
    describe(.failures)
)]
pub struct DispatchError {
    /// Every sink that failed, in registration order
    pub failures: Vec<SinkFailure>,
    /// Sinks that recorded the report
    pub succeeded: Vec<String>,
}

impl DispatchError {
    /// Names of the failed sinks
    pub fn failed_sinks(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.sink.as_str()).collect()
    }

    /// True when every failure is a permanent misconfiguration
    pub fn all_permanent(&self) -> bool {
        self.failures.iter().all(|f| f.error.is_permanent())
    }
}

fn describe(failures: &[SinkFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({}: {})", f.sink, f.error.kind(), f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

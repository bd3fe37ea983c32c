//! Zentinel IDS Agent Library
//!
//! Request-time intrusion detection: every parameter of an incoming request
//! is matched against a catalog of attack signatures, matches are collected
//! into a report with an aggregate impact and category tags, and non-empty
//! reports are recorded by pluggable sinks.
//!
//! # Features
//!
//! - **Signature Catalog**: Case-insensitive regex rules compiled once into a
//!   one-pass matcher and shared across request threads
//! - **Impact Scoring**: Events and reports sum the impact of every matching
//!   signature, no short-circuiting
//! - **Durable Records**: Append-only file sink and SQLite sink, one shared
//!   instance per target
//! - **Aggregate Failures**: A failing sink never stops the others
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zentinel_agent_ids::{rules, Dispatcher, Monitor, RequestContext, RequestInput, SinkRegistry};
//!
//! let catalog = Arc::new(rules::default_catalog()?);
//! let monitor = Monitor::new(catalog);
//!
//! let input = RequestInput::new().with("GET", "q", "\"><script>eval(window.name)</script>");
//! let report = monitor.run(&input);
//!
//! if !report.is_empty() {
//!     let registry = SinkRegistry::new();
//!     let dispatcher = Dispatcher::new();
//!     dispatcher.add_sink(registry.file("/var/log/ids.log"));
//!     dispatcher.dispatch(&report, &RequestContext::new().with_remote_addr("203.0.113.7"))?;
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod input;
pub mod metrics;
pub mod monitor;
pub mod normalize;
pub mod report;
pub mod rules;
pub mod signature;
pub mod sink;

// Re-exports for convenience
pub use catalog::{evaluate, SignatureCatalog};
pub use config::{GeneralConfig, IdsConfig, LoggingConfig, SinkKind};
pub use context::{RequestContext, ResolvedRequest};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, ErrorKind, RecordError, SignatureError, SinkError, SinkFailure};
pub use event::Event;
pub use input::{ParamValue, RequestInput};
pub use metrics::IdsMetrics;
pub use monitor::Monitor;
pub use normalize::{Identity, Normalizer};
pub use report::Report;
pub use signature::{Signature, SignatureBuilder, SignatureDef};
pub use sink::{DatabaseSink, FileSink, RecordLine, Sink, SinkRegistry};

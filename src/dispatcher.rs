//! Logging dispatcher
//!
//! Fans one report out to every registered sink. A failing sink never
//! stops the others; all failures come back together in a
//! [`DispatchError`] that also lists the sinks that succeeded.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{IdsConfig, SinkKind};
use crate::context::RequestContext;
use crate::error::{DispatchError, SinkError, SinkFailure};
use crate::metrics::IdsMetrics;
use crate::report::Report;
use crate::sink::{Sink, SinkRegistry};

/// Set of sinks, unique by instance identity
#[derive(Default)]
pub struct Dispatcher {
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
    metrics: Option<Arc<IdsMetrics>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the sink set selected by the `logging` configuration section
    ///
    /// Sinks are obtained from `registry`, so dispatchers built from the
    /// same configuration share their sink instances.
    pub fn from_config(config: &IdsConfig, registry: &SinkRegistry) -> Result<Self, SinkError> {
        let dispatcher = Self::new();

        for kind in &config.logging.sinks {
            match kind {
                SinkKind::File => {
                    let path = config.log_file_path().ok_or_else(|| {
                        SinkError::MalformedTarget("file sink enabled without logging.path".into())
                    })?;
                    dispatcher.add_sink(registry.file(path));
                }
                SinkKind::Database => {
                    let wrapper = config.logging.wrapper.as_deref().ok_or_else(|| {
                        SinkError::MalformedTarget(
                            "database sink enabled without logging.wrapper".into(),
                        )
                    })?;
                    dispatcher.add_sink(registry.database(wrapper, &config.logging.table)?);
                }
            }
        }

        info!(sinks = ?dispatcher.sink_names(), "Dispatcher configured");
        Ok(dispatcher)
    }

    pub fn with_metrics(mut self, metrics: Arc<IdsMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Register a sink; returns false when this instance is already present
    pub fn add_sink(&self, sink: Arc<dyn Sink>) -> bool {
        let mut sinks = self.sinks.write();
        if sinks.iter().any(|s| same_sink(s, &sink)) {
            return false;
        }
        debug!(sink = sink.name(), "Sink registered");
        sinks.push(sink);
        true
    }

    /// Remove a sink by identity; returns whether it was registered
    pub fn remove_sink(&self, sink: &Arc<dyn Sink>) -> bool {
        let mut sinks = self.sinks.write();
        match sinks.iter().position(|s| same_sink(s, sink)) {
            Some(idx) => {
                sinks.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.read().is_empty()
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.read().iter().map(|s| s.name().to_string()).collect()
    }

    /// Hand the report to every sink, in registration order
    ///
    /// Request metadata is resolved once up front. Returns the names of
    /// the sinks that recorded the report. Empty reports are not recorded.
    pub fn dispatch(
        &self,
        report: &Report,
        context: &RequestContext,
    ) -> Result<Vec<String>, DispatchError> {
        if report.is_empty() {
            debug!("Empty report not dispatched");
            return Ok(Vec::new());
        }

        let request = context.resolve();
        // Snapshot so sink I/O runs without holding the lock
        let sinks: Vec<Arc<dyn Sink>> = self.sinks.read().clone();

        let mut succeeded = Vec::with_capacity(sinks.len());
        let mut failures = Vec::new();

        for sink in &sinks {
            match sink.execute(report, &request) {
                Ok(()) => succeeded.push(sink.name().to_string()),
                Err(error) => {
                    warn!(
                        sink = sink.name(),
                        kind = %error.kind(),
                        error = %error,
                        "Sink failed to record report"
                    );
                    failures.push(SinkFailure {
                        sink: sink.name().to_string(),
                        error,
                    });
                }
            }
        }

        let result = if failures.is_empty() {
            Ok(succeeded)
        } else {
            Err(DispatchError {
                failures,
                succeeded,
            })
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_dispatch(result.as_ref().map(|_| ()));
        }

        result
    }
}

fn same_sink(a: &Arc<dyn Sink>, b: &Arc<dyn Sink>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

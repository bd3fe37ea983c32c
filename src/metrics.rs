//! IDS Metrics
//!
//! Counters for monitoring the detector and its sinks:
//! - Requests scanned and reports carrying events
//! - Events and per-tag detection counts
//! - Dispatches and sink failures by sink
//!
//! Exported as Prometheus text or JSON.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::report::Report;

/// IDS metrics collector
pub struct IdsMetrics {
    // Scan counters
    requests_scanned: AtomicU64,
    reports_with_events: AtomicU64,
    events_total: AtomicU64,
    impact_total: AtomicU64,

    // Per-tag counters
    events_by_tag: RwLock<HashMap<String, u64>>,

    // Dispatch counters
    dispatches_total: AtomicU64,
    dispatches_failed: AtomicU64,
    sink_failures: RwLock<HashMap<String, u64>>,

    start_time: Instant,
}

impl IdsMetrics {
    pub fn new() -> Self {
        Self {
            requests_scanned: AtomicU64::new(0),
            reports_with_events: AtomicU64::new(0),
            events_total: AtomicU64::new(0),
            impact_total: AtomicU64::new(0),
            events_by_tag: RwLock::new(HashMap::new()),
            dispatches_total: AtomicU64::new(0),
            dispatches_failed: AtomicU64::new(0),
            sink_failures: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record the outcome of one scanned request
    pub fn record_report(&self, report: &Report) {
        self.requests_scanned.fetch_add(1, Ordering::Relaxed);

        if report.is_empty() {
            return;
        }

        self.reports_with_events.fetch_add(1, Ordering::Relaxed);
        self.events_total
            .fetch_add(report.len() as u64, Ordering::Relaxed);
        self.impact_total
            .fetch_add(u64::from(report.impact()), Ordering::Relaxed);

        let mut by_tag = self.events_by_tag.write();
        for event in report {
            for tag in event.tags() {
                *by_tag.entry(tag).or_insert(0) += 1;
            }
        }
    }

    /// Record one dispatch and any sinks that failed during it
    pub fn record_dispatch(&self, result: Result<(), &DispatchError>) {
        self.dispatches_total.fetch_add(1, Ordering::Relaxed);

        if let Err(err) = result {
            self.dispatches_failed.fetch_add(1, Ordering::Relaxed);
            let mut failures = self.sink_failures.write();
            for sink in err.failed_sinks() {
                *failures.entry(sink.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics in Prometheus text format
    pub fn prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP ids_requests_scanned_total Total number of requests scanned\n");
        output.push_str("# TYPE ids_requests_scanned_total counter\n");
        output.push_str(&format!(
            "ids_requests_scanned_total {}\n",
            self.requests_scanned.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP ids_reports_with_events_total Requests that produced at least one event\n");
        output.push_str("# TYPE ids_reports_with_events_total counter\n");
        output.push_str(&format!(
            "ids_reports_with_events_total {}\n",
            self.reports_with_events.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP ids_events_total Total number of events\n");
        output.push_str("# TYPE ids_events_total counter\n");
        output.push_str(&format!(
            "ids_events_total {}\n",
            self.events_total.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP ids_impact_total Sum of report impacts\n");
        output.push_str("# TYPE ids_impact_total counter\n");
        output.push_str(&format!(
            "ids_impact_total {}\n",
            self.impact_total.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP ids_events_by_tag Events by signature tag\n");
        output.push_str("# TYPE ids_events_by_tag counter\n");
        let by_tag = self.events_by_tag.read();
        for (tag, count) in by_tag.iter() {
            output.push_str(&format!(
                "ids_events_by_tag{{tag=\"{}\"}} {}\n",
                escape_label(tag),
                count
            ));
        }

        output.push_str("# HELP ids_dispatches_total Total number of report dispatches\n");
        output.push_str("# TYPE ids_dispatches_total counter\n");
        output.push_str(&format!(
            "ids_dispatches_total {}\n",
            self.dispatches_total.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP ids_dispatches_failed_total Dispatches where at least one sink failed\n");
        output.push_str("# TYPE ids_dispatches_failed_total counter\n");
        output.push_str(&format!(
            "ids_dispatches_failed_total {}\n",
            self.dispatches_failed.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP ids_sink_failures Sink failures by sink\n");
        output.push_str("# TYPE ids_sink_failures counter\n");
        let failures = self.sink_failures.read();
        for (sink, count) in failures.iter() {
            output.push_str(&format!(
                "ids_sink_failures{{sink=\"{}\"}} {}\n",
                escape_label(sink),
                count
            ));
        }

        output.push_str("# HELP ids_uptime_seconds Seconds since the detector started\n");
        output.push_str("# TYPE ids_uptime_seconds gauge\n");
        output.push_str(&format!("ids_uptime_seconds {}\n", self.uptime_secs()));

        output
    }

    /// Export metrics as JSON
    pub fn json(&self) -> serde_json::Value {
        let by_tag = self.events_by_tag.read();
        let failures = self.sink_failures.read();

        serde_json::json!({
            "scans": {
                "requests": self.requests_scanned.load(Ordering::Relaxed),
                "reports_with_events": self.reports_with_events.load(Ordering::Relaxed),
                "impact_total": self.impact_total.load(Ordering::Relaxed)
            },
            "events": {
                "total": self.events_total.load(Ordering::Relaxed),
                "by_tag": by_tag.clone()
            },
            "dispatch": {
                "total": self.dispatches_total.load(Ordering::Relaxed),
                "failed": self.dispatches_failed.load(Ordering::Relaxed),
                "sink_failures": failures.clone()
            },
            "uptime_seconds": self.uptime_secs()
        })
    }

    /// Get summary statistics
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            requests_scanned: self.requests_scanned.load(Ordering::Relaxed),
            reports_with_events: self.reports_with_events.load(Ordering::Relaxed),
            events_total: self.events_total.load(Ordering::Relaxed),
            dispatches_total: self.dispatches_total.load(Ordering::Relaxed),
            dispatches_failed: self.dispatches_failed.load(Ordering::Relaxed),
            uptime_secs: self.uptime_secs(),
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.requests_scanned.store(0, Ordering::Relaxed);
        self.reports_with_events.store(0, Ordering::Relaxed);
        self.events_total.store(0, Ordering::Relaxed);
        self.impact_total.store(0, Ordering::Relaxed);
        self.dispatches_total.store(0, Ordering::Relaxed);
        self.dispatches_failed.store(0, Ordering::Relaxed);

        self.events_by_tag.write().clear();
        self.sink_failures.write().clear();
    }
}

/// Escape a Prometheus label value
fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

impl Default for IdsMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub requests_scanned: u64,
    pub reports_with_events: u64,
    pub events_total: u64,
    pub dispatches_total: u64,
    pub dispatches_failed: u64,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SinkError, SinkFailure};
    use crate::event::Event;
    use crate::signature::SignatureBuilder;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn sample_report() -> Report {
        let xss = Arc::new(
            SignatureBuilder::new(1)
                .pattern("<script")
                .impact(6)
                .tags(&["xss", "csrf"])
                .build()
                .unwrap(),
        );
        let sqli = Arc::new(
            SignatureBuilder::new(2)
                .pattern("union select")
                .impact(5)
                .tags(&["sqli"])
                .build()
                .unwrap(),
        );

        let mut report = Report::new();
        report.add_event(Event::new("GET.a", "<script>", vec![Arc::clone(&xss)]).unwrap());
        report.add_event(Event::new("GET.b", "union select", vec![sqli]).unwrap());
        report.add_event(Event::new("POST.c", "<script>", vec![xss]).unwrap());
        report
    }

    #[test]
    fn test_report_recording() {
        let metrics = IdsMetrics::default();

        metrics.record_report(&sample_report());
        metrics.record_report(&Report::new());

        let summary = metrics.summary();
        assert_eq!(summary.requests_scanned, 2);
        assert_eq!(summary.reports_with_events, 1);
        assert_eq!(summary.events_total, 3);

        let json = metrics.json();
        let by_tag = json["events"]["by_tag"].as_object().unwrap();
        assert_eq!(by_tag["xss"], 2);
        assert_eq!(by_tag["sqli"], 1);
        assert_eq!(json["scans"]["impact_total"], 17);
    }

    #[test]
    fn test_dispatch_recording() {
        let metrics = IdsMetrics::default();
        let err = DispatchError {
            failures: vec![SinkFailure {
                sink: "file:/missing.log".to_string(),
                error: SinkError::TargetMissing(PathBuf::from("/missing.log")),
            }],
            succeeded: vec![],
        };

        metrics.record_dispatch(Ok(()));
        metrics.record_dispatch(Err(&err));

        let summary = metrics.summary();
        assert_eq!(summary.dispatches_total, 2);
        assert_eq!(summary.dispatches_failed, 1);
        assert_eq!(metrics.json()["dispatch"]["sink_failures"]["file:/missing.log"], 1);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = IdsMetrics::default();
        metrics.record_report(&sample_report());

        let output = metrics.prometheus();
        assert!(output.contains("# HELP ids_requests_scanned_total"));
        assert!(output.contains("ids_requests_scanned_total 1"));
        assert!(output.contains("ids_events_by_tag{tag=\"csrf\"} 2"));
        assert!(output.contains("ids_uptime_seconds"));
    }

    #[test]
    fn test_prometheus_escapes_tag_labels() {
        let sig = Arc::new(
            SignatureBuilder::new(9)
                .pattern("x")
                .impact(1)
                .tags(&["a\"b\\c"])
                .build()
                .unwrap(),
        );
        let mut report = Report::new();
        report.add_event(Event::new("GET.q", "x", vec![sig]).unwrap());

        let metrics = IdsMetrics::default();
        metrics.record_report(&report);

        let output = metrics.prometheus();
        assert!(output.contains("ids_events_by_tag{tag=\"a\\\"b\\\\c\"} 1\n"));
    }

    #[test]
    fn test_reset() {
        let metrics = IdsMetrics::default();
        metrics.record_report(&sample_report());
        metrics.reset();

        let summary = metrics.summary();
        assert_eq!(summary.requests_scanned, 0);
        assert_eq!(summary.events_total, 0);
        assert!(metrics.json()["events"]["by_tag"].as_object().unwrap().is_empty());
    }
}

//! Request monitor
//!
//! Scans every flattened parameter of a request against the shared
//! signature catalog and collects the matches into a [`Report`].

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::SignatureCatalog;
use crate::config::IdsConfig;
use crate::event::Event;
use crate::input::RequestInput;
use crate::metrics::IdsMetrics;
use crate::normalize::{Identity, Normalizer};
use crate::report::Report;
use crate::signature::Signature;

/// Per-request scanner over a shared, precompiled catalog
pub struct Monitor {
    catalog: Arc<SignatureCatalog>,
    normalizer: Arc<dyn Normalizer>,
    exceptions: HashSet<String>,
    scan_keys: bool,
    metrics: Option<Arc<IdsMetrics>>,
}

impl Monitor {
    /// Create a monitor with identity normalization and no exceptions
    pub fn new(catalog: Arc<SignatureCatalog>) -> Self {
        Self {
            catalog,
            normalizer: Arc::new(Identity),
            exceptions: HashSet::new(),
            scan_keys: false,
            metrics: None,
        }
    }

    /// Create a monitor that honors the `general` configuration section
    pub fn with_config(catalog: Arc<SignatureCatalog>, config: &IdsConfig) -> Self {
        let monitor = Self {
            exceptions: config.general.exceptions.iter().cloned().collect(),
            scan_keys: config.general.scan_keys,
            ..Self::new(catalog)
        };

        info!(
            signatures = monitor.catalog.len(),
            exceptions = monitor.exceptions.len(),
            scan_keys = monitor.scan_keys,
            "Monitor initialized"
        );

        monitor
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<IdsMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Add a parameter name (`scope.name`) that is never scanned
    pub fn add_exception(&mut self, name: &str) {
        self.exceptions.insert(name.to_string());
    }

    pub fn catalog(&self) -> &Arc<SignatureCatalog> {
        &self.catalog
    }

    /// Scan a request and return the report of everything that matched
    ///
    /// An invalid event never aborts the scan; it is logged and the
    /// remaining parameters are still scanned.
    pub fn run(&self, input: &RequestInput) -> Report {
        let mut report = Report::new();

        for (name, value) in input.flatten() {
            if self.is_exception(&name) {
                debug!(parameter = %name, "Parameter excluded from scan");
                continue;
            }

            let matched = self.scan_value(&name, &value);
            if matched.is_empty() {
                continue;
            }

            match Event::new(name, value, matched) {
                Ok(event) => report.add_event(event),
                Err(e) => warn!(error = %e, "Discarded invalid event"),
            }
        }

        if !report.is_empty() {
            info!(
                events = report.len(),
                impact = report.impact(),
                tags = %report.tags().join(","),
                "Intrusion attempt detected"
            );
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_report(&report);
        }

        report
    }

    /// Signatures matching one parameter, in catalog order
    ///
    /// The value is normalized before matching. With key scanning enabled
    /// the parameter name is evaluated too and both match sets are merged.
    pub fn scan_value(&self, name: &str, value: &str) -> Vec<Arc<Signature>> {
        let value_matches = if value.is_empty() {
            Vec::new()
        } else {
            self.catalog.evaluate(&self.normalizer.normalize(value))
        };

        if !self.scan_keys {
            return value_matches;
        }

        let key = leaf_name(name);
        let key_matches = self.catalog.evaluate(&self.normalizer.normalize(key));
        if key_matches.is_empty() {
            return value_matches;
        }

        self.catalog
            .signatures()
            .iter()
            .filter(|sig| {
                value_matches.iter().any(|m| Arc::ptr_eq(m, sig))
                    || key_matches.iter().any(|m| Arc::ptr_eq(m, sig))
            })
            .cloned()
            .collect()
    }

    fn is_exception(&self, name: &str) -> bool {
        if self.exceptions.contains(name) {
            return true;
        }
        // `scope.name` also excludes everything flattened beneath it
        self.exceptions.iter().any(|e| {
            name.strip_prefix(e.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

/// Parameter name without its scope prefix
fn leaf_name(name: &str) -> &str {
    name.split_once('.').map(|(_, rest)| rest).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ParamValue;
    use crate::signature::SignatureBuilder;

    fn test_catalog() -> Arc<SignatureCatalog> {
        Arc::new(SignatureCatalog::new(vec![
            SignatureBuilder::new(1)
                .pattern(r"<\s*script")
                .description("Script tag")
                .impact(6)
                .tags(&["xss", "csrf"])
                .build()
                .unwrap(),
            SignatureBuilder::new(2)
                .pattern(r"eval\s*\(")
                .description("eval call")
                .impact(4)
                .tags(&["xss", "rfe"])
                .build()
                .unwrap(),
            SignatureBuilder::new(3)
                .pattern(r"union\s+select")
                .description("UNION SELECT")
                .impact(5)
                .tags(&["sqli"])
                .build()
                .unwrap(),
        ]))
    }

    fn test_monitor() -> Monitor {
        Monitor::new(test_catalog())
    }

    #[test]
    fn test_single_parameter_attack() {
        let monitor = test_monitor();
        let input = RequestInput::new().with("GET", "test", "\"><script>eval(window.name)</script>");

        let report = monitor.run(&input);
        assert_eq!(report.len(), 1);

        let event = report.get_event("GET.test").unwrap();
        assert_eq!(event.impact(), 10);
        assert_eq!(event.tags(), vec!["xss", "csrf", "rfe"]);
        assert_eq!(event.value(), "\"><script>eval(window.name)</script>");
    }

    #[test]
    fn test_benign_request_is_empty() {
        let monitor = test_monitor();
        let input = RequestInput::new()
            .with("GET", "q", "rust programming")
            .with("POST", "name", "Alice")
            .with("COOKIE", "session", "");

        assert!(monitor.run(&input).is_empty());
    }

    #[test]
    fn test_events_follow_scan_order() {
        let monitor = test_monitor();
        let input = RequestInput::new()
            .with("GET", "a", "1 union select 2")
            .with("GET", "b", "fine")
            .with("POST", "c", "<script>");

        let report = monitor.run(&input);
        let names: Vec<&str> = report.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["GET.a", "POST.c"]);
        assert_eq!(report.impact(), 11);
    }

    #[test]
    fn test_exceptions_are_skipped() {
        let mut config = IdsConfig::default();
        config.general.exceptions = vec!["COOKIE.__utmz".to_string()];
        let monitor = Monitor::with_config(test_catalog(), &config);

        let input = RequestInput::new()
            .with("COOKIE", "__utmz", "<script>")
            .with("COOKIE", "other", "<script>");

        let report = monitor.run(&input);
        assert!(!report.has_event("COOKIE.__utmz"));
        assert!(report.has_event("COOKIE.other"));
    }

    #[test]
    fn test_normalizer_sees_candidate_but_event_keeps_original() {
        let decode = |v: &str| v.replace("%3C", "<");
        let monitor = test_monitor().with_normalizer(Arc::new(decode));

        let input = RequestInput::new().with("GET", "x", "%3Cscript");
        let report = monitor.run(&input);

        let event = report.get_event("GET.x").unwrap();
        assert_eq!(event.value(), "%3Cscript");
    }

    #[test]
    fn test_scan_keys() {
        let input = RequestInput::new().with("GET", "<script>", "harmless");

        assert!(test_monitor().run(&input).is_empty());

        let mut config = IdsConfig::default();
        config.general.scan_keys = true;
        let monitor = Monitor::with_config(test_catalog(), &config);

        let report = monitor.run(&input);
        let event = report.get_event("GET.<script>").unwrap();
        assert_eq!(event.signatures()[0].id(), 1);
    }

    #[test]
    fn test_exception_covers_flattened_children() {
        let mut monitor = test_monitor();
        monitor.add_exception("POST.profile");

        let input = RequestInput::new()
            .with(
                "POST",
                "profile",
                ParamValue::Map(vec![("bio".to_string(), "<script>".into())]),
            )
            .with("POST", "profiles", "<script>");

        let report = monitor.run(&input);
        assert!(!report.has_event("POST.profile.bio"));
        assert!(report.has_event("POST.profiles"));
    }

    #[test]
    fn test_leaf_name() {
        assert_eq!(leaf_name("GET.user.name"), "user.name");
        assert_eq!(leaf_name("plain"), "plain");
    }

    #[test]
    fn test_metrics_recorded() {
        let metrics = Arc::new(IdsMetrics::new());
        let monitor = test_monitor().with_metrics(Arc::clone(&metrics));

        monitor.run(&RequestInput::new().with("GET", "q", "<script>"));
        monitor.run(&RequestInput::new().with("GET", "q", "hello"));

        let summary = metrics.summary();
        assert_eq!(summary.requests_scanned, 2);
        assert_eq!(summary.reports_with_events, 1);
        assert_eq!(summary.events_total, 1);
    }
}

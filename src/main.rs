//! Zentinel IDS CLI
//!
//! Scans one request against the signature catalog, prints the report and
//! records it through the configured sinks.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use zentinel_agent_ids::{
    rules, Dispatcher, IdsConfig, IdsMetrics, Monitor, RequestContext, RequestInput,
    SignatureCatalog, SignatureDef, SinkRegistry,
};

/// Version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "zentinel-ids")]
#[command(version, about = "Request intrusion detection for Zentinel")]
struct Args {
    /// Parameters to scan, as scope.name=value (e.g. GET.q=<script>)
    params: Vec<String>,

    /// JSON request document: {"GET": {"q": "..."}, "COOKIE": {...}}
    #[arg(long, env = "IDS_REQUEST")]
    request: Option<PathBuf>,

    /// Resolved JSON configuration file
    #[arg(short, long, env = "IDS_CONFIG")]
    config: Option<PathBuf>,

    /// JSON signature definitions replacing the built-in catalog
    #[arg(long, env = "IDS_RULES")]
    rules: Option<PathBuf>,

    /// Override the file sink target
    #[arg(long, env = "IDS_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Originating address of the request
    #[arg(long, env = "IDS_REMOTE_ADDR")]
    remote_addr: Option<String>,

    /// X-Forwarded-For value of the request
    #[arg(long, env = "IDS_FORWARDED_FOR")]
    forwarded_for: Option<String>,

    /// Request URI
    #[arg(long, env = "IDS_REQUEST_URI")]
    request_uri: Option<String>,

    /// Address of the server that received the request
    #[arg(long, env = "IDS_SERVER_ADDR")]
    server_addr: Option<String>,

    /// Report output format
    #[arg(long, value_enum, default_value = "text", env = "IDS_FORMAT")]
    format: OutputFormat,

    /// Print the report without recording it
    #[arg(long)]
    no_dispatch: bool,

    /// Print Prometheus metrics after the scan
    #[arg(long)]
    metrics: bool,

    /// Enable verbose logging
    #[arg(short, long, env = "IDS_VERBOSE")]
    verbose: bool,
}

impl Args {
    fn load_config(&self) -> Result<IdsConfig> {
        let mut config = match &self.config {
            Some(path) => IdsConfig::from_file(path)?,
            None => IdsConfig::default(),
        };

        if let Some(path) = &self.log_file {
            config.logging.path = Some(path.clone());
        }

        Ok(config)
    }

    fn load_input(&self) -> Result<RequestInput> {
        let mut input = match &self.request {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read request: {}", path.display()))?;
                let value: serde_json::Value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse request: {}", path.display()))?;
                RequestInput::from_json(&value)?
            }
            None => RequestInput::new(),
        };

        for param in &self.params {
            let (scope, name, value) = parse_param(param)?;
            input.add(scope, name, value);
        }

        if input.is_empty() {
            bail!("nothing to scan: pass scope.name=value arguments or --request");
        }
        Ok(input)
    }

    fn to_context(&self) -> RequestContext {
        RequestContext {
            remote_addr: self.remote_addr.clone(),
            forwarded_for: self.forwarded_for.clone(),
            request_uri: self.request_uri.clone(),
            server_addr: self.server_addr.clone(),
            ..Default::default()
        }
    }
}

/// Split `scope.name=value`
fn parse_param(param: &str) -> Result<(&str, &str, &str)> {
    let Some((key, value)) = param.split_once('=') else {
        bail!("parameter '{}' is not scope.name=value", param);
    };
    match key.split_once('.') {
        Some((scope, name)) if !scope.is_empty() && !name.is_empty() => Ok((scope, name, value)),
        _ => bail!("parameter name '{}' is not scope.name", key),
    }
}

fn load_catalog(rules_path: Option<&Path>) -> Result<SignatureCatalog> {
    match rules_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read rules: {}", path.display()))?;
            let defs: Vec<SignatureDef> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse rules: {}", path.display()))?;
            Ok(SignatureCatalog::from_defs(&defs))
        }
        None => rules::default_catalog(),
    }
}

/// Tracing filter covering the binary and the library targets
fn log_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!(
        "{}={level},zentinel_agent_ids={level}",
        env!("CARGO_CRATE_NAME")
    )
}

/// Install panic hook for production diagnostics
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("Unknown panic payload");

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());

        // tracing may not work during panic
        eprintln!("PANIC: IDS panicked at {}: {}", location, payload);

        error!(
            panic_payload = %payload,
            panic_location = %location,
            "IDS panicked"
        );

        default_hook(panic_info);
    }));
}

fn run(args: &Args) -> Result<ExitCode> {
    let config = args.load_config()?;
    let input = args.load_input()?;
    let catalog = Arc::new(load_catalog(args.rules.as_deref())?);
    let metrics = Arc::new(IdsMetrics::new());

    let monitor = Monitor::with_config(catalog, &config).with_metrics(Arc::clone(&metrics));
    let report = monitor.run(&input);

    match args.format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        ),
    }

    let mut exit = ExitCode::SUCCESS;

    if !report.is_empty() && !args.no_dispatch {
        let registry = SinkRegistry::new();
        let dispatcher = Dispatcher::from_config(&config, &registry)
            .context("Failed to configure sinks")?
            .with_metrics(Arc::clone(&metrics));

        match dispatcher.dispatch(&report, &args.to_context()) {
            Ok(sinks) => info!(sinks = ?sinks, "Report recorded"),
            Err(e) => {
                warn!(
                    failed = ?e.failed_sinks(),
                    permanent = e.all_permanent(),
                    "Report dispatch failed"
                );
                eprintln!("error: {}", e);
                exit = ExitCode::FAILURE;
            }
        }
    }

    if args.metrics {
        eprint!("{}", metrics.prometheus());
    }

    Ok(exit)
}

fn main() -> ExitCode {
    // Install panic hook first for early crash diagnostics
    install_panic_hook();

    let args = Args::parse();

    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.verbose))
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!(version = VERSION, "Starting Zentinel IDS");

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "IDS run failed");
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("GET.q=<script>").unwrap(),
            ("GET", "q", "<script>")
        );
        assert_eq!(parse_param("POST.a.b=x=y").unwrap(), ("POST", "a.b", "x=y"));
        assert!(parse_param("GET.q").is_err());
        assert!(parse_param("q=1").is_err());
        assert!(parse_param(".q=1").is_err());
    }

    #[test]
    fn test_log_filter_includes_library_target() {
        let verbose = log_filter(true);
        assert!(verbose.contains("zentinel_agent_ids=debug"));
        assert!(verbose.starts_with(&format!("{}=debug", env!("CARGO_CRATE_NAME"))));

        assert!(log_filter(false).contains("zentinel_agent_ids=info"));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "zentinel-ids",
            "--format",
            "json",
            "--remote-addr",
            "203.0.113.7",
            "GET.q=1",
        ])
        .unwrap();

        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.params, vec!["GET.q=1"]);
        assert_eq!(
            args.to_context().remote_addr.as_deref(),
            Some("203.0.113.7")
        );
    }
}

//! Append-only file sink
//!
//! Each report becomes one line:
//!
//! ```text
//! "<origin>",<time>,<impact>,"<tags>","<name=value ...>","<path>","<server>"
//! ```
//!
//! The origin, each tag, parameter names and values, and the path are
//! percent-encoded so attacker-controlled text can never break the line or
//! its quoting. The target file is never created here; it has to be
//! provisioned by the operator.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use urlencoding::{decode, encode};

use super::Sink;
use crate::context::ResolvedRequest;
use crate::error::{RecordError, SinkError};
use crate::report::Report;

const FIELD_COUNT: usize = 7;

/// Sink appending one record line per report to an existing file
pub struct FileSink {
    path: PathBuf,
    name: String,
    write_lock: Mutex<()>,
}

impl FileSink {
    /// Create a sink for `path`
    ///
    /// Prefer [`SinkRegistry::file`](super::SinkRegistry::file) so a path
    /// is only ever written through one instance.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("file:{}", path.display()),
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_target(&self) -> Result<(), SinkError> {
        let metadata = match fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(e) => return Err(self.open_error(e)),
        };

        if metadata.is_dir() {
            return Err(SinkError::MalformedTarget(format!(
                "{} is a directory",
                self.path.display()
            )));
        }
        if metadata.permissions().readonly() {
            return Err(SinkError::NotWritable(self.path.clone()));
        }
        Ok(())
    }

    fn open_error(&self, e: io::Error) -> SinkError {
        match e.kind() {
            io::ErrorKind::NotFound => SinkError::TargetMissing(self.path.clone()),
            io::ErrorKind::PermissionDenied => SinkError::NotWritable(self.path.clone()),
            _ => SinkError::Write {
                target: self.path.clone(),
                source: e,
            },
        }
    }

    fn append(&self, line: &str) -> Result<(), SinkError> {
        let _guard = self.write_lock.lock();

        self.check_target()?;

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.open_error(e))?;

        let write_err = |source| SinkError::Write {
            target: self.path.clone(),
            source,
        };
        file.write_all(line.as_bytes()).map_err(write_err)?;
        file.write_all(b"\n").map_err(write_err)?;
        file.flush().map_err(write_err)
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, report: &Report, request: &ResolvedRequest) -> Result<(), SinkError> {
        if report.is_empty() {
            return Ok(());
        }

        let line = format_record(report, request, Utc::now());
        self.append(&line)?;

        debug!(
            target_file = %self.path.display(),
            impact = report.impact(),
            "Report recorded"
        );
        Ok(())
    }
}

/// Serialize a report into one durable record line, without the newline
pub fn format_record(report: &Report, request: &ResolvedRequest, at: DateTime<Utc>) -> String {
    let parameters = report
        .iter()
        .map(|event| format!("{}={}", encode(event.name()), encode(event.value())))
        .collect::<Vec<_>>()
        .join(" ");

    let tags = report
        .tags()
        .iter()
        .map(|tag| encode(tag).into_owned())
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "\"{}\",{},{},\"{}\",\"{}\",\"{}\",\"{}\"",
        encode(&request.origin()),
        at.to_rfc3339_opts(SecondsFormat::Secs, true),
        report.impact(),
        tags,
        parameters,
        encode(&request.path),
        plain(&request.server_addr),
    )
}

// Unencoded fields must not carry quotes or line breaks
fn plain(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '"' | '\r' | '\n'))
        .collect()
}

/// A record line read back into its fields, percent-decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLine {
    pub origin: String,
    pub recorded_at: DateTime<FixedOffset>,
    pub impact: u32,
    pub tags: Vec<String>,
    pub parameters: Vec<(String, String)>,
    pub path: String,
    pub server_addr: String,
}

impl RecordLine {
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let fields = split_fields(line.trim_end_matches(['\r', '\n']));
        if fields.len() != FIELD_COUNT {
            return Err(RecordError::FieldCount {
                expected: FIELD_COUNT,
                found: fields.len(),
            });
        }

        let origin = decode(unquote(fields[0], "origin")?)?.into_owned();
        let recorded_at = DateTime::parse_from_rfc3339(fields[1])?;
        let impact = fields[2].parse()?;
        let tags = unquote(fields[3], "tags")?
            .split_whitespace()
            .map(|tag| decode(tag).map(|t| t.into_owned()))
            .collect::<Result<_, _>>()?;

        let mut parameters = Vec::new();
        for pair in unquote(fields[4], "parameters")?.split_whitespace() {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| RecordError::Parameter(pair.to_string()))?;
            parameters.push((decode(name)?.into_owned(), decode(value)?.into_owned()));
        }

        let path = decode(unquote(fields[5], "path")?)?.into_owned();
        let server_addr = unquote(fields[6], "server")?.to_string();

        Ok(Self {
            origin,
            recorded_at,
            impact,
            tags,
            parameters,
            path,
            server_addr,
        })
    }
}

fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut quoted = false;

    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                fields.push(&line[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    fields.push(&line[start..]);
    fields
}

fn unquote<'a>(field: &'a str, name: &'static str) -> Result<&'a str, RecordError> {
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .ok_or(RecordError::Unquoted { field: name })
}

//! SQLite sink
//!
//! Inserts one row per event. The database file and the table are
//! provisioned out of band; opening a sink never creates either.

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::Sink;
use crate::context::ResolvedRequest;
use crate::error::SinkError;
use crate::report::Report;

const WRAPPER_SCHEME: &str = "sqlite:";

/// Sink recording events into an existing SQLite table
#[derive(Debug)]
pub struct DatabaseSink {
    name: String,
    path: PathBuf,
    table: String,
    insert_sql: String,
    conn: Mutex<Connection>,
}

impl DatabaseSink {
    /// Table layout expected by the sink, for the default table name
    pub const SCHEMA: &'static str = r#"
        CREATE TABLE IF NOT EXISTS intrusions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            value TEXT NOT NULL,
            page TEXT NOT NULL,
            tags TEXT NOT NULL,
            ip TEXT NOT NULL,
            ip2 TEXT NOT NULL,
            impact INTEGER NOT NULL,
            origin TEXT NOT NULL,
            created TEXT NOT NULL
        );
    "#;

    /// Open the database named by `wrapper` (`sqlite:<path>`)
    pub fn open(wrapper: &str, table: &str) -> Result<Self, SinkError> {
        let path = wrapper
            .strip_prefix(WRAPPER_SCHEME)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                SinkError::MalformedTarget(format!("unsupported database wrapper '{}'", wrapper))
            })?;

        if !is_identifier(table) {
            return Err(SinkError::MalformedTarget(format!(
                "invalid table name '{}'",
                table
            )));
        }

        let path = Path::new(path);
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SinkError::TargetMissing(path.to_path_buf()));
            }
            Err(e) => {
                return Err(SinkError::MalformedTarget(format!("{}: {}", path.display(), e)));
            }
        };
        if !metadata.is_file() {
            return Err(SinkError::MalformedTarget(format!(
                "{} is not a database file",
                path.display()
            )));
        }
        if metadata.permissions().readonly() {
            return Err(SinkError::NotWritable(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| classify(e, path))?;

        let exists: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .map_err(|e| classify(e, path))?;
        if exists == 0 {
            return Err(SinkError::MalformedTarget(format!(
                "table '{}' does not exist in {}",
                table,
                path.display()
            )));
        }

        let insert_sql = format!(
            "INSERT INTO \"{}\" (name, value, page, tags, ip, ip2, impact, origin, created) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            table
        );
        // A table missing one of the columns fails here, not on first insert
        if let Err(e) = conn.prepare_cached(&insert_sql) {
            return Err(match e {
                rusqlite::Error::SqliteFailure(ref err, ref msg)
                    if err.code == ErrorCode::Unknown =>
                {
                    SinkError::MalformedTarget(format!(
                        "table '{}' does not fit the intrusion layout: {}",
                        table,
                        msg.as_deref().unwrap_or("unknown error")
                    ))
                }
                e => classify(e, path),
            });
        }

        Ok(Self {
            name: format!("database:{}", wrapper),
            path: path.to_path_buf(),
            table: table.to_string(),
            insert_sql,
            conn: Mutex::new(conn),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Sink for DatabaseSink {
    fn name(&self) -> &str {
        &self.name
    }

    /// All rows of one report are inserted in a single transaction
    fn execute(&self, report: &Report, request: &ResolvedRequest) -> Result<(), SinkError> {
        let created = Utc::now().to_rfc3339();
        let ip2 = request.forwarded_for.as_deref().unwrap_or("");

        let mut conn = self.conn.lock();
        self.insert(&mut conn, report, request, &created, ip2)
            .map_err(|e| classify(e, &self.path))?;

        debug!(sink = %self.name, rows = report.len(), "Report recorded");
        Ok(())
    }
}

impl DatabaseSink {
    fn insert(
        &self,
        conn: &mut Connection,
        report: &Report,
        request: &ResolvedRequest,
        created: &str,
        ip2: &str,
    ) -> rusqlite::Result<()> {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for event in report {
                stmt.execute(params![
                    event.name(),
                    event.value(),
                    request.path,
                    event.tags().join(", "),
                    request.remote_addr,
                    ip2,
                    event.impact(),
                    request.server_addr,
                    created,
                ])?;
            }
        }
        tx.commit()
    }
}

/// Map SQLite failures that no retry can fix onto permanent sink errors.
/// Busy, locked and I/O failures stay transient.
fn classify(err: rusqlite::Error, path: &Path) -> SinkError {
    let code = match &err {
        rusqlite::Error::SqliteFailure(e, _) => e.code,
        _ => return SinkError::Database(err),
    };
    match code {
        ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt | ErrorCode::CannotOpen => {
            SinkError::MalformedTarget(format!("{}: {}", path.display(), err))
        }
        ErrorCode::ReadOnly | ErrorCode::PermissionDenied => {
            SinkError::NotWritable(path.to_path_buf())
        }
        _ => SinkError::Database(err),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

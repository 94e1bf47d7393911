//! SQLite-backed verification log.
//!
//! One row per record. Triggers reject UPDATE and DELETE so the table stays
//! append-only even when opened by other tools.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};

use hashdrop_core::{Digest, VerificationRecord};

use crate::log::{LogError, VerificationLog};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS verification_log (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp       TEXT    NOT NULL,
    timestamp_ns    INTEGER NOT NULL,
    payload_name    TEXT    NOT NULL,
    expected_digest TEXT    NOT NULL,
    actual_digest   TEXT    NOT NULL,
    verified        INTEGER NOT NULL,
    status          TEXT    NOT NULL,
    source_address  TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS verification_log_ts ON verification_log (timestamp_ns);
CREATE TRIGGER IF NOT EXISTS verification_log_no_update
    BEFORE UPDATE ON verification_log
    BEGIN SELECT RAISE(ABORT, 'verification log is append-only'); END;
CREATE TRIGGER IF NOT EXISTS verification_log_no_delete
    BEFORE DELETE ON verification_log
    BEGIN SELECT RAISE(ABORT, 'verification log is append-only'); END;
";

#[derive(Clone)]
pub struct SqliteLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLog {
    /// Open (or create) the log at `path`. Fails if the database cannot be
    /// opened or the schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self, LogError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LogError::Unavailable(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, LogError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, LogError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, LogError>,
    ) -> Result<T, LogError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| LogError::Unavailable("sqlite connection lock poisoned".into()))?;
        f(&conn)
    }
}

/// Nanoseconds since the epoch, saturating outside the years 1677..2262.
fn sort_key(t: DateTime<Utc>) -> i64 {
    t.timestamp_nanos_opt().unwrap_or(if t.timestamp() < 0 {
        i64::MIN
    } else {
        i64::MAX
    })
}

struct Row {
    timestamp: String,
    payload_name: String,
    expected_digest: String,
    actual_digest: String,
    verified: bool,
    status: String,
    source_address: String,
}

impl Row {
    fn into_record(self) -> Result<VerificationRecord, LogError> {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| LogError::Corrupt(format!("bad timestamp {:?}: {e}", self.timestamp)))?
            .with_timezone(&Utc);
        let record = VerificationRecord::new(
            timestamp,
            self.payload_name,
            Digest::from_hex(self.expected_digest),
            Digest::from_hex(self.actual_digest),
            Some(self.source_address),
        );
        if record.verified() != self.verified || record.status().as_str() != self.status {
            return Err(LogError::Corrupt(format!(
                "row at {} disagrees with its digests",
                self.timestamp
            )));
        }
        Ok(record)
    }
}

impl VerificationLog for SqliteLog {
    fn append(&self, record: &VerificationRecord) -> Result<(), LogError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO verification_log
                    (timestamp, timestamp_ns, payload_name, expected_digest,
                     actual_digest, verified, status, source_address)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record
                        .timestamp()
                        .to_rfc3339_opts(SecondsFormat::Nanos, true),
                    sort_key(record.timestamp()),
                    record.payload_name(),
                    record.expected_digest().as_str(),
                    record.actual_digest().as_str(),
                    record.verified(),
                    record.status().as_str(),
                    record.source_address(),
                ],
            )?;
            Ok(())
        })
    }

    fn range(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<VerificationRecord>, LogError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, payload_name, expected_digest, actual_digest,
                        verified, status, source_address
                 FROM verification_log
                 WHERE (?1 IS NULL OR timestamp_ns >= ?1)
                   AND (?2 IS NULL OR timestamp_ns < ?2)
                 ORDER BY id",
            )?;
            let rows = stmt.query_map(
                params![
                    since.map(sort_key),
                    until.map(sort_key)
                ],
                |row| {
                    Ok(Row {
                        timestamp: row.get(0)?,
                        payload_name: row.get(1)?,
                        expected_digest: row.get(2)?,
                        actual_digest: row.get(3)?,
                        verified: row.get(4)?,
                        status: row.get(5)?,
                        source_address: row.get(6)?,
                    })
                },
            )?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?.into_record()?);
            }
            Ok(records)
        })
    }

    fn len(&self) -> Result<usize, LogError> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM verification_log", [], |r| r.get(0))?;
            Ok(count as usize)
        })
    }
}

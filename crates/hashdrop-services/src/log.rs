//! Verification log: append-only sink of verification records.
//!
//! The transfer client only ever appends. `range` and `len` exist for
//! reporting surfaces (the consumer's `/records` endpoint, the CLI).

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;

use hashdrop_core::VerificationRecord;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("verification log unavailable: {0}")]
    Unavailable(String),
    #[error("verification log storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

/// Append-only record sink.
///
/// Implementations must never modify or drop a record once `append`
/// has returned `Ok`.
pub trait VerificationLog: Send + Sync {
    /// Persist one record.
    fn append(&self, record: &VerificationRecord) -> Result<(), LogError>;

    /// Records with `since <= timestamp < until`, oldest first. Open bounds
    /// when `None`.
    fn range(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<VerificationRecord>, LogError>;

    /// Number of records stored.
    fn len(&self) -> Result<usize, LogError>;

    fn is_empty(&self) -> Result<bool, LogError> {
        Ok(self.len()? == 0)
    }
}

pub(crate) fn in_range(
    ts: DateTime<Utc>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> bool {
    since.is_none_or(|s| ts >= s) && until.is_none_or(|u| ts < u)
}

/// In-memory log. Lost on restart.
#[derive(Clone, Default)]
pub struct MemoryLog {
    records: Arc<RwLock<Vec<VerificationRecord>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, oldest first.
    pub fn records(&self) -> Vec<VerificationRecord> {
        self.records
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl VerificationLog for MemoryLog {
    fn append(&self, record: &VerificationRecord) -> Result<(), LogError> {
        self.records
            .write()
            .map_err(|_| LogError::Unavailable("memory log lock poisoned".into()))?
            .push(record.clone());
        Ok(())
    }

    fn range(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<VerificationRecord>, LogError> {
        let records = self
            .records
            .read()
            .map_err(|_| LogError::Unavailable("memory log lock poisoned".into()))?;
        Ok(records
            .iter()
            .filter(|r| in_range(r.timestamp(), since, until))
            .cloned()
            .collect())
    }

    fn len(&self) -> Result<usize, LogError> {
        self.records
            .read()
            .map(|r| r.len())
            .map_err(|_| LogError::Unavailable("memory log lock poisoned".into()))
    }
}

//! Transfer client — one generate → fetch → verify → record cycle.
//!
//! Cycle states:
//!
//!   Idle → MetadataRequested → PayloadRequested → Verifying → Logged → Idle
//!
//! Any of the first three states can drop to Failed on its own error. From
//! Verifying, the only path to Failed is a log append error, and that error
//! carries the record that was verified but not stored.
//!
//! A digest mismatch is not an error: the cycle completes and the record
//! says `Failed`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use hashdrop_core::crypto::{Digest, Hasher};
use hashdrop_core::wire::error_kind;
use hashdrop_core::VerificationRecord;

use crate::log::{LogError, VerificationLog};
use crate::source::{PayloadSource, SourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    MetadataRequested,
    PayloadRequested,
    Verifying,
    Logged,
    Failed,
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("metadata unavailable: {0}")]
    MetadataUnavailable(#[source] SourceError),
    #[error("payload unavailable: {0}")]
    PayloadUnavailable(#[source] SourceError),
    #[error("failed to store payload at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Verification finished but the record could not be appended.
    #[error("payload verified ({}) but the record was not logged: {source}", record.status())]
    Unlogged {
        record: Box<VerificationRecord>,
        source: LogError,
    },
}

impl CycleError {
    /// Stable machine-readable name for this failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::MetadataUnavailable(_) => error_kind::METADATA_UNAVAILABLE,
            CycleError::PayloadUnavailable(_) => error_kind::PAYLOAD_UNAVAILABLE,
            CycleError::Storage { .. } => error_kind::STORAGE,
            CycleError::Unlogged { .. } => error_kind::UNLOGGED,
        }
    }

    /// True for local storage and log failures.
    pub fn is_persistence(&self) -> bool {
        matches!(self, CycleError::Storage { .. } | CycleError::Unlogged { .. })
    }

    /// The completed record, for a cycle that verified but was not logged.
    pub fn record(&self) -> Option<&VerificationRecord> {
        match self {
            CycleError::Unlogged { record, .. } => Some(record.as_ref()),
            _ => None,
        }
    }

    /// State the cycle was in when it failed.
    pub fn failed_in(&self) -> CycleState {
        match self {
            CycleError::MetadataUnavailable(_) => CycleState::MetadataRequested,
            CycleError::PayloadUnavailable(_) | CycleError::Storage { .. } => {
                CycleState::PayloadRequested
            }
            CycleError::Unlogged { .. } => CycleState::Verifying,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Name the payload is recorded under.
    pub payload_name: String,
    /// File the received bytes are written to.
    pub destination: PathBuf,
}

/// Runs verification cycles against one source, into one log.
///
/// Cycles on the same client are serialised: the destination file is
/// shared between them.
#[derive(Clone)]
pub struct TransferClient {
    source: Arc<dyn PayloadSource>,
    log: Arc<dyn VerificationLog>,
    settings: TransferSettings,
    cycle_lock: Arc<Mutex<()>>,
    state: Arc<RwLock<CycleState>>,
}

impl TransferClient {
    pub fn new(
        source: Arc<dyn PayloadSource>,
        log: Arc<dyn VerificationLog>,
        settings: TransferSettings,
    ) -> Self {
        Self {
            source,
            log,
            settings,
            cycle_lock: Arc::new(Mutex::new(())),
            state: Arc::new(RwLock::new(CycleState::Idle)),
        }
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    pub fn log(&self) -> &Arc<dyn VerificationLog> {
        &self.log
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    pub fn state(&self) -> CycleState {
        self.state.read().map(|s| *s).unwrap_or(CycleState::Failed)
    }

    fn transition(&self, to: CycleState) {
        if let Ok(mut state) = self.state.write() {
            tracing::debug!(from = ?*state, to = ?to, "cycle state");
            *state = to;
        }
    }

    fn fail(&self, err: CycleError) -> CycleError {
        self.transition(CycleState::Failed);
        tracing::warn!(
            kind = err.kind(),
            state = ?err.failed_in(),
            source = %self.source.describe(),
            error = %err,
            "verification cycle failed"
        );
        self.transition(CycleState::Idle);
        err
    }

    /// Run one full cycle.
    ///
    /// `source_address` is the network origin of whoever asked for the
    /// cycle; `None` is recorded as "unknown".
    pub async fn run_cycle(
        &self,
        source_address: Option<String>,
    ) -> Result<VerificationRecord, CycleError> {
        let _cycle = self.cycle_lock.lock().await;

        self.transition(CycleState::MetadataRequested);
        let metadata = match self.source.metadata().await {
            Ok(m) => m,
            Err(e) => return Err(self.fail(CycleError::MetadataUnavailable(e))),
        };
        if !metadata.digest.is_well_formed() {
            tracing::warn!(
                digest = %metadata.digest,
                "producer digest is not lowercase SHA-256 hex; verification will fail"
            );
        }

        self.transition(CycleState::PayloadRequested);
        let bytes = match self.source.payload(metadata.locator.as_ref()).await {
            Ok(b) => b,
            Err(e) => return Err(self.fail(CycleError::PayloadUnavailable(e))),
        };

        let destination = &self.settings.destination;
        let actual = match store(destination, &bytes).await {
            Ok(d) => d,
            Err(e) => {
                return Err(self.fail(CycleError::Storage {
                    path: destination.clone(),
                    source: e,
                }));
            }
        };

        self.transition(CycleState::Verifying);
        let record = VerificationRecord::new(
            Utc::now(),
            self.settings.payload_name.clone(),
            metadata.digest,
            actual,
            source_address,
        );
        if !record.verified() {
            tracing::warn!(
                expected = %record.expected_digest(),
                actual = %record.actual_digest(),
                bytes = bytes.len(),
                "integrity mismatch"
            );
        }

        let log = Arc::clone(&self.log);
        let pending = record.clone();
        let appended = tokio::task::spawn_blocking(move || log.append(&pending))
            .await
            .unwrap_or_else(|e| Err(LogError::Unavailable(format!("append task failed: {e}"))));
        if let Err(e) = appended {
            return Err(self.fail(CycleError::Unlogged {
                record: Box::new(record),
                source: e,
            }));
        }
        self.transition(CycleState::Logged);

        tracing::info!(
            status = %record.status(),
            digest = %record.expected_digest(),
            bytes = bytes.len(),
            path = %destination.display(),
            source_address = record.source_address(),
            "verification cycle complete"
        );
        self.transition(CycleState::Idle);
        Ok(record)
    }
}

const STORE_CHUNK: usize = 64 * 1024;

/// Write the received bytes and return the digest of exactly what was
/// written. The handle is flushed, synced and closed before this returns,
/// on success or failure.
async fn store(path: &Path, data: &[u8]) -> std::io::Result<Digest> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(path).await?;
    let mut hasher = Hasher::new();
    for chunk in data.chunks(STORE_CHUNK) {
        file.write_all(chunk).await?;
        hasher.update(chunk);
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(hasher.finalize())
}

//! Transfer metadata and verification records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::Digest;

/// Source address recorded when the caller's origin is not known.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Opaque identifier for one payload generation.
///
/// Issued fresh on every generation so a fetch can name the exact payload
/// whose digest it was told about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadLocator(String);

impl PayloadLocator {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A random 128-bit locator, hex encoded.
    pub fn random() -> Self {
        Self(hex::encode(rand::random::<[u8; 16]>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PayloadLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the producer reports before the payload is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferMetadata {
    pub digest: Digest,
    /// `None` when the producer does not issue locators; the fetch then
    /// asks for whatever payload is current.
    pub locator: Option<PayloadLocator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationStatus {
    Success,
    Failed,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationStatus::Success => "Success",
            VerificationStatus::Failed => "Failed",
        }
    }

    pub fn from_verified(verified: bool) -> Self {
        if verified {
            VerificationStatus::Success
        } else {
            VerificationStatus::Failed
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("verified flag disagrees with digest comparison")]
    VerifiedMismatch,
    #[error("status disagrees with verified flag")]
    StatusMismatch,
}

/// Outcome of one completed transfer cycle.
///
/// Immutable once built. `verified` and `status` are derived from the two
/// digests and cannot be set independently; deserialisation rejects input
/// where they disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord")]
pub struct VerificationRecord {
    timestamp: DateTime<Utc>,
    payload_name: String,
    expected_digest: Digest,
    actual_digest: Digest,
    verified: bool,
    status: VerificationStatus,
    source_address: String,
}

impl VerificationRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        payload_name: impl Into<String>,
        expected_digest: Digest,
        actual_digest: Digest,
        source_address: Option<String>,
    ) -> Self {
        let verified = expected_digest == actual_digest;
        Self {
            timestamp,
            payload_name: payload_name.into(),
            expected_digest,
            actual_digest,
            verified,
            status: VerificationStatus::from_verified(verified),
            source_address: source_address
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn payload_name(&self) -> &str {
        &self.payload_name
    }

    pub fn expected_digest(&self) -> &Digest {
        &self.expected_digest
    }

    pub fn actual_digest(&self) -> &Digest {
        &self.actual_digest
    }

    pub fn verified(&self) -> bool {
        self.verified
    }

    pub fn status(&self) -> VerificationStatus {
        self.status
    }

    pub fn source_address(&self) -> &str {
        &self.source_address
    }
}

#[derive(Deserialize)]
struct RawRecord {
    timestamp: DateTime<Utc>,
    payload_name: String,
    expected_digest: Digest,
    actual_digest: Digest,
    verified: bool,
    status: VerificationStatus,
    source_address: String,
}

impl TryFrom<RawRecord> for VerificationRecord {
    type Error = RecordError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        if raw.verified != (raw.expected_digest == raw.actual_digest) {
            return Err(RecordError::VerifiedMismatch);
        }
        if raw.status != VerificationStatus::from_verified(raw.verified) {
            return Err(RecordError::StatusMismatch);
        }
        Ok(Self {
            timestamp: raw.timestamp,
            payload_name: raw.payload_name,
            expected_digest: raw.expected_digest,
            actual_digest: raw.actual_digest,
            verified: raw.verified,
            status: raw.status,
            source_address: raw.source_address,
        })
    }
}

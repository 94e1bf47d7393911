//! HTTP body shapes shared by both services and the transfer client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::Digest;
use crate::record::{PayloadLocator, TransferMetadata, VerificationRecord};

/// `message` field of a successful `/generate` response.
pub const GENERATED_MESSAGE: &str = "File generated";

/// Attachment name used when serving the payload from `/file`.
pub const PAYLOAD_FILE_NAME: &str = "data.txt";

/// Query parameter naming the payload generation a fetch expects.
pub const LOCATOR_PARAM: &str = "locator";

/// Body of `GET /generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub message: String,
    pub checksum: String,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("response carries an empty checksum")]
    EmptyChecksum,
}

impl GenerateResponse {
    pub fn new(metadata: &TransferMetadata, file_path: String) -> Self {
        Self {
            message: GENERATED_MESSAGE.to_string(),
            checksum: metadata.digest.as_str().to_string(),
            file_path,
            locator: metadata.locator.as_ref().map(|l| l.as_str().to_string()),
        }
    }

    /// Extract the metadata the transfer client needs.
    pub fn into_metadata(self) -> Result<TransferMetadata, WireError> {
        if self.checksum.is_empty() {
            return Err(WireError::EmptyChecksum);
        }
        Ok(TransferMetadata {
            digest: Digest::from_hex(self.checksum),
            locator: self
                .locator
                .filter(|l| !l.is_empty())
                .map(PayloadLocator::new),
        })
    }
}

/// Machine-readable error kinds reported by the consumer service.
pub mod error_kind {
    pub const METADATA_UNAVAILABLE: &str = "metadata_unavailable";
    pub const PAYLOAD_UNAVAILABLE: &str = "payload_unavailable";
    pub const STORAGE: &str = "storage";
    pub const UNLOGGED: &str = "unlogged";
    pub const NOT_FOUND: &str = "not_found";
    pub const SUPERSEDED: &str = "superseded";
    pub const BAD_REQUEST: &str = "bad_request";
    pub const INTERNAL: &str = "internal";
}

/// JSON error body returned by both services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    /// Present only for a cycle that verified but could not be logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<VerificationRecord>,
}

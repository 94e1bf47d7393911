//! Payload generator — the producer's single live payload.
//!
//! Each generation replaces the previous payload and issues a fresh
//! locator. Generation and the swap happen under one lock, so a fetch never
//! sees bytes that disagree with the digest last reported.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::Mutex;

use hashdrop_core::crypto::{digest, Digest};
use hashdrop_core::{PayloadLocator, PayloadSpec, TransferMetadata};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("no payload has been generated yet")]
    NotFound,
    #[error("payload {requested} was superseded by a newer generation")]
    Superseded { requested: PayloadLocator },
    #[error("failed to store payload at {0}: {1}")]
    Storage(PathBuf, std::io::Error),
}

struct CurrentPayload {
    locator: PayloadLocator,
    digest: Digest,
    bytes: Bytes,
    generated_at: Instant,
}

/// Producer-side payload cell.
#[derive(Clone)]
pub struct PayloadGenerator {
    spec: PayloadSpec,
    /// Where each generation is mirrored on disk. `None` keeps it in memory only.
    path: Option<PathBuf>,
    current: Arc<Mutex<Option<CurrentPayload>>>,
}

impl PayloadGenerator {
    pub fn new(spec: PayloadSpec, path: Option<PathBuf>) -> Self {
        Self {
            spec,
            path,
            current: Arc::new(Mutex::new(None)),
        }
    }

    pub fn spec(&self) -> &PayloadSpec {
        &self.spec
    }

    pub fn payload_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create a new payload, replacing the previous one, and report its digest.
    ///
    /// If the on-disk copy cannot be written the previous payload stays live.
    pub async fn generate_metadata(&self) -> Result<TransferMetadata, GeneratorError> {
        let mut current = self.current.lock().await;

        let bytes = Bytes::from(self.spec.generate());
        if let Some(path) = &self.path {
            let target = path.clone();
            let data = bytes.clone();
            let written = tokio::task::spawn_blocking(move || write_atomic(&target, &data))
                .await
                .unwrap_or_else(|e| Err(std::io::Error::other(e)));
            written.map_err(|e| GeneratorError::Storage(path.clone(), e))?;
        }

        let digest = digest(&bytes);
        let locator = PayloadLocator::random();

        if let Some(previous) = current.as_ref() {
            tracing::debug!(
                locator = %previous.locator,
                age_ms = previous.generated_at.elapsed().as_millis() as u64,
                "payload superseded"
            );
        }
        tracing::info!(
            locator = %locator,
            bytes = bytes.len(),
            digest = %digest,
            "payload generated"
        );

        *current = Some(CurrentPayload {
            locator: locator.clone(),
            digest: digest.clone(),
            bytes,
            generated_at: Instant::now(),
        });

        Ok(TransferMetadata {
            digest,
            locator: Some(locator),
        })
    }

    /// Bytes of the most recent payload. Never regenerates.
    pub async fn fetch_payload(&self) -> Result<Bytes, GeneratorError> {
        let current = self.current.lock().await;
        current
            .as_ref()
            .map(|p| p.bytes.clone())
            .ok_or(GeneratorError::NotFound)
    }

    /// Bytes of the payload named by `locator`, provided it is still current.
    pub async fn fetch_payload_for(
        &self,
        locator: &PayloadLocator,
    ) -> Result<Bytes, GeneratorError> {
        let current = self.current.lock().await;
        match current.as_ref() {
            None => Err(GeneratorError::NotFound),
            Some(p) if &p.locator == locator => Ok(p.bytes.clone()),
            Some(_) => Err(GeneratorError::Superseded {
                requested: locator.clone(),
            }),
        }
    }

    /// Locator and digest of the current payload, if any.
    pub async fn current(&self) -> Option<TransferMetadata> {
        self.current.lock().await.as_ref().map(|p| TransferMetadata {
            digest: p.digest.clone(),
            locator: Some(p.locator.clone()),
        })
    }
}

/// Write via a temp file and rename so readers never see a partial payload.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)
}

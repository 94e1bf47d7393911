//! Payload sources: where the transfer client gets metadata and bytes.
//!
//! `HttpPayloadSource` talks to a remote producer service. The generator
//! itself is also a source, for running both sides in one process.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use hashdrop_core::wire::{GenerateResponse, LOCATOR_PARAM};
use hashdrop_core::{PayloadLocator, TransferMetadata};

use crate::generator::{GeneratorError, PayloadGenerator};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("producer unreachable: {0}")]
    Unreachable(String),
    #[error("producer did not answer within {0:?}")]
    Timeout(Duration),
    #[error("producer answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed metadata: {0}")]
    Malformed(String),
    #[error("no payload available: {0}")]
    NoPayload(String),
}

/// The producer side of one transfer cycle, as seen by the consumer.
#[async_trait]
pub trait PayloadSource: Send + Sync {
    /// Ask the producer for a fresh payload and its digest.
    async fn metadata(&self) -> Result<TransferMetadata, SourceError>;

    /// Fetch payload bytes. With a locator, only that generation is accepted.
    async fn payload(&self, locator: Option<&PayloadLocator>) -> Result<Bytes, SourceError>;

    /// Short description for log lines.
    fn describe(&self) -> String;
}

// ── HTTP ──────────────────────────────────────────────────────────────────────

/// Remote producer reached over HTTP.
#[derive(Clone)]
pub struct HttpPayloadSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPayloadSource {
    /// Every request made through this source is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Unreachable(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else {
            SourceError::Unreachable(e.to_string())
        }
    }

    async fn get(&self, url: &str) -> Result<Bytes, SourceError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl PayloadSource for HttpPayloadSource {
    async fn metadata(&self) -> Result<TransferMetadata, SourceError> {
        let body = self.get(&format!("{}/generate", self.base_url)).await?;
        let resp: GenerateResponse =
            serde_json::from_slice(&body).map_err(|e| SourceError::Malformed(e.to_string()))?;
        resp.into_metadata()
            .map_err(|e| SourceError::Malformed(e.to_string()))
    }

    async fn payload(&self, locator: Option<&PayloadLocator>) -> Result<Bytes, SourceError> {
        let url = match locator {
            Some(l) => format!("{}/file?{}={}", self.base_url, LOCATOR_PARAM, l),
            None => format!("{}/file", self.base_url),
        };
        self.get(&url).await
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

// ── In-process ────────────────────────────────────────────────────────────────

#[async_trait]
impl PayloadSource for PayloadGenerator {
    async fn metadata(&self) -> Result<TransferMetadata, SourceError> {
        self.generate_metadata()
            .await
            .map_err(|e| SourceError::Unreachable(e.to_string()))
    }

    async fn payload(&self, locator: Option<&PayloadLocator>) -> Result<Bytes, SourceError> {
        let result = match locator {
            Some(l) => self.fetch_payload_for(l).await,
            None => self.fetch_payload().await,
        };
        result.map_err(|e| match e {
            GeneratorError::NotFound | GeneratorError::Superseded { .. } => {
                SourceError::NoPayload(e.to_string())
            }
            GeneratorError::Storage(..) => SourceError::Unreachable(e.to_string()),
        })
    }

    fn describe(&self) -> String {
        "in-process generator".to_string()
    }
}

//! HTTP handlers for the producer and consumer services.

pub mod consumer;
pub mod producer;

use std::sync::{Arc, RwLock};

use axum::http::StatusCode;
use axum::Json;

use hashdrop_core::wire::ErrorBody;
use hashdrop_core::VerificationRecord;
use hashdrop_services::{PayloadGenerator, TransferClient};

/// Error half of every fallible handler: status plus a JSON body that names
/// the failure class.
pub type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Clone)]
pub struct ProducerState {
    pub generator: PayloadGenerator,
}

#[derive(Clone)]
pub struct ConsumerState {
    pub client: TransferClient,
    /// Most recent `/fetch` outcome, shown on the status page.
    pub last: Arc<RwLock<Option<LastOutcome>>>,
}

impl ConsumerState {
    pub fn new(client: TransferClient) -> Self {
        Self {
            client,
            last: Arc::new(RwLock::new(None)),
        }
    }

    fn remember(&self, outcome: LastOutcome) {
        if let Ok(mut last) = self.last.write() {
            *last = Some(outcome);
        }
    }

    fn last_outcome(&self) -> Option<LastOutcome> {
        self.last.read().ok().and_then(|l| l.clone())
    }
}

/// What the last cycle triggered through the consumer service produced.
#[derive(Debug, Clone)]
pub enum LastOutcome {
    Completed(VerificationRecord),
    Failed { kind: String, message: String },
}

// ── Shared helpers ────────────────────────────────────────────────────────────

fn api_error(status: StatusCode, kind: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: kind.to_string(),
            message: message.into(),
            record: None,
        }),
    )
}

// Re-export handler functions for use in router setup.
pub use consumer::{handle_fetch, handle_index, handle_records};
pub use producer::{handle_file, handle_generate};

pub async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

//! Producer handlers: /generate and /file.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use hashdrop_core::wire::{error_kind, GenerateResponse, PAYLOAD_FILE_NAME};
use hashdrop_core::PayloadLocator;
use hashdrop_services::GeneratorError;

use super::{api_error, ApiError, ProducerState};

fn generator_error(e: GeneratorError) -> ApiError {
    match e {
        GeneratorError::NotFound => {
            api_error(StatusCode::NOT_FOUND, error_kind::NOT_FOUND, e.to_string())
        }
        GeneratorError::Superseded { .. } => {
            api_error(StatusCode::CONFLICT, error_kind::SUPERSEDED, e.to_string())
        }
        GeneratorError::Storage(..) => {
            tracing::error!(error = %e, "payload generation failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, error_kind::STORAGE, e.to_string())
        }
    }
}

// ── /generate ─────────────────────────────────────────────────────────────────

pub async fn handle_generate(
    State(state): State<ProducerState>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let metadata = state
        .generator
        .generate_metadata()
        .await
        .map_err(generator_error)?;

    let file_path = state
        .generator
        .payload_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "memory".to_string());

    Ok(Json(GenerateResponse::new(&metadata, file_path)))
}

// ── /file ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    pub locator: Option<String>,
}

pub async fn handle_file(
    State(state): State<ProducerState>,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    let bytes = match query.locator.filter(|l| !l.is_empty()) {
        Some(l) => state.generator.fetch_payload_for(&PayloadLocator::new(l)).await,
        None => state.generator.fetch_payload().await,
    }
    .map_err(generator_error)?;

    tracing::debug!(bytes = bytes.len(), "serving payload");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{PAYLOAD_FILE_NAME}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

//! Consumer handlers: status page, transfer trigger and record queries.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Query, Request, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hashdrop_core::wire::{error_kind, ErrorBody};
use hashdrop_core::VerificationRecord;
use hashdrop_services::CycleError;

use super::{api_error, ApiError, ConsumerState, LastOutcome};

// ── /fetch ────────────────────────────────────────────────────────────────────

fn cycle_error(e: &CycleError) -> ApiError {
    let status = if e.is_persistence() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_GATEWAY
    };
    (
        status,
        Json(ErrorBody {
            error: e.kind().to_string(),
            message: e.to_string(),
            record: e.record().cloned(),
        }),
    )
}

/// Run one transfer cycle. A digest mismatch is still a 200: the cycle
/// completed and the record says `Failed`.
pub async fn handle_fetch(
    State(state): State<ConsumerState>,
    request: Request,
) -> Result<Json<VerificationRecord>, ApiError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    match state.client.run_cycle(peer).await {
        Ok(record) => {
            tracing::info!(
                status = %record.status(),
                source = record.source_address(),
                "fetch completed"
            );
            state.remember(LastOutcome::Completed(record.clone()));
            Ok(Json(record))
        }
        Err(e) => {
            state.remember(LastOutcome::Failed {
                kind: e.kind().to_string(),
                message: e.to_string(),
            });
            Err(cycle_error(&e))
        }
    }
}

// ── /records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RecordsQuery {
    pub since: Option<String>,
    pub until: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordsResponse {
    pub count: usize,
    pub records: Vec<VerificationRecord>,
}

fn parse_bound(name: &str, raw: Option<String>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match raw.filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| {
                api_error(
                    StatusCode::BAD_REQUEST,
                    error_kind::BAD_REQUEST,
                    format!("invalid {name} timestamp {s:?}: {e}"),
                )
            }),
    }
}

pub async fn handle_records(
    State(state): State<ConsumerState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let since = parse_bound("since", query.since)?;
    let until = parse_bound("until", query.until)?;

    let records = state.client.log().range(since, until).map_err(|e| {
        tracing::error!(error = %e, "failed to read verification log");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, error_kind::STORAGE, e.to_string())
    })?;

    Ok(Json(RecordsResponse {
        count: records.len(),
        records,
    }))
}

// ── / ────────────────────────────────────────────────────────────────────────

pub async fn handle_index(State(state): State<ConsumerState>) -> Html<String> {
    let logged = state
        .client
        .log()
        .len()
        .map(|n| n.to_string())
        .unwrap_or_else(|_| "unavailable".to_string());

    let outcome = match state.last_outcome() {
        None => "<p>No transfer has run yet.</p>".to_string(),
        Some(LastOutcome::Completed(r)) => format!(
            "<table>\
             <tr><th>Status</th><td>{}</td></tr>\
             <tr><th>Time</th><td>{}</td></tr>\
             <tr><th>Payload</th><td>{}</td></tr>\
             <tr><th>Expected</th><td><code>{}</code></td></tr>\
             <tr><th>Actual</th><td><code>{}</code></td></tr>\
             <tr><th>Requested by</th><td>{}</td></tr>\
             </table>",
            r.status(),
            r.timestamp().to_rfc3339(),
            escape_html(r.payload_name()),
            escape_html(r.expected_digest().as_str()),
            escape_html(r.actual_digest().as_str()),
            escape_html(r.source_address()),
        ),
        Some(LastOutcome::Failed { kind, message }) => format!(
            "<p>Last transfer could not complete (<code>{}</code>): {}</p>",
            escape_html(&kind),
            escape_html(&message),
        ),
    };

    Html(format!(
        "<!doctype html>\n<html><head><title>hashdrop consumer</title></head><body>\
         <h1>hashdrop consumer</h1>\
         <p>Producer: <code>{}</code></p>\
         <p>Records logged: {}</p>\
         <h2>Last transfer</h2>{}\
         <form method=\"post\" action=\"/fetch\"><button>Fetch now</button></form>\
         </body></html>\n",
        escape_html(&state.client.source_description()),
        logged,
        outcome,
    ))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

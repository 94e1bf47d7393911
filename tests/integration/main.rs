//! hashdrop integration test harness.
//!
//! Every test starts its own producer and consumer services on loopback
//! listeners with port 0, so tests run in parallel without sharing state.
//!
//!   cargo test --test integration

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use hashdrop_api::{ConsumerState, ProducerState};
use hashdrop_core::PayloadSpec;
use hashdrop_services::{
    HttpPayloadSource, PayloadGenerator, SqliteLog, TransferClient, TransferSettings,
    VerificationLog,
};

mod consumer;
mod producer;
mod source;

// ── Harness ───────────────────────────────────────────────────────────────────

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

async fn loopback() -> Result<(TcpListener, String)> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind loopback listener")?;
    let addr: SocketAddr = listener.local_addr()?;
    Ok((listener, format!("http://{addr}")))
}

/// A port with nothing listening on it.
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

/// Start a producer service. `dir` receives the on-disk payload copy.
pub async fn spawn_producer(dir: &std::path::Path) -> Result<String> {
    let (listener, url) = loopback().await?;
    let generator = PayloadGenerator::new(PayloadSpec::default(), Some(dir.join("data.txt")));
    tokio::spawn(hashdrop_api::serve_producer(listener, ProducerState { generator }));
    Ok(url)
}

/// Start a consumer service fetching from `producer_url` into `log`.
pub async fn spawn_consumer(
    producer_url: &str,
    log: Arc<dyn VerificationLog>,
    dir: &std::path::Path,
) -> Result<String> {
    let (listener, url) = loopback().await?;
    let source = HttpPayloadSource::new(producer_url, REQUEST_TIMEOUT)?;
    let client = TransferClient::new(
        Arc::new(source),
        log,
        TransferSettings {
            payload_name: "received.txt".into(),
            destination: dir.join("clientdata").join("received.txt"),
        },
    );
    tokio::spawn(hashdrop_api::serve_consumer(listener, ConsumerState::new(client)));
    Ok(url)
}

/// Producer and consumer wired together over HTTP, logging to SQLite.
pub struct Pair {
    pub producer: String,
    pub consumer: String,
    pub log: SqliteLog,
    pub dir: tempfile::TempDir,
}

pub async fn spawn_pair() -> Result<Pair> {
    let dir = tempfile::tempdir()?;
    let log = SqliteLog::open(&dir.path().join("verification.db"))?;
    let producer = spawn_producer(&dir.path().join("serverdata")).await?;
    let consumer = spawn_consumer(&producer, Arc::new(log.clone()), dir.path()).await?;
    Ok(Pair {
        producer,
        consumer,
        log,
        dir,
    })
}

pub async fn get(url: &str) -> Result<reqwest::Response> {
    reqwest::get(url)
        .await
        .with_context(|| format!("GET {url} failed"))
}

pub async fn post(url: &str) -> Result<reqwest::Response> {
    reqwest::Client::new()
        .post(url)
        .send()
        .await
        .with_context(|| format!("POST {url} failed"))
}

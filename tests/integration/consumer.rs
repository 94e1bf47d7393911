use crate::*;

use axum::routing::get as route_get;
use axum::{Json, Router};
use chrono::SecondsFormat;
use hashdrop_api::handlers::consumer::RecordsResponse;
use hashdrop_core::wire::ErrorBody;
use hashdrop_core::{digest, VerificationRecord, VerificationStatus};
use hashdrop_services::{LogError, MemoryLog};

/// A producer whose advertised checksum never matches the bytes it serves.
async fn spawn_tampering_producer() -> String {
    let advertised = digest(b"what the producer promised").as_str().to_string();
    let app = Router::new()
        .route(
            "/generate",
            route_get(move || {
                let checksum = advertised.clone();
                async move {
                    Json(serde_json::json!({
                        "message": "File generated",
                        "checksum": checksum,
                        "file_path": "/serverdata/data.txt",
                    }))
                }
            }),
        )
        .route("/file", route_get(|| async { "what was actually delivered" }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move { axum::serve(listener, app).await });
    url
}

struct DownLog;

impl VerificationLog for DownLog {
    fn append(&self, _: &VerificationRecord) -> Result<(), LogError> {
        Err(LogError::Unavailable("disk detached".into()))
    }

    fn range(
        &self,
        _: Option<chrono::DateTime<chrono::Utc>>,
        _: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<VerificationRecord>, LogError> {
        Err(LogError::Unavailable("disk detached".into()))
    }

    fn len(&self) -> Result<usize, LogError> {
        Err(LogError::Unavailable("disk detached".into()))
    }
}

#[tokio::test]
async fn test_fetch_verifies_and_logs() {
    let pair = spawn_pair().await.unwrap();

    let resp = post(&format!("{}/fetch", pair.consumer)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let record: VerificationRecord = resp.json().await.unwrap();
    assert!(record.verified());
    assert_eq!(record.status(), VerificationStatus::Success);
    assert_eq!(record.payload_name(), "received.txt");
    assert_eq!(record.source_address(), "127.0.0.1");

    let stored = std::fs::read(pair.dir.path().join("clientdata/received.txt")).unwrap();
    assert_eq!(stored.len(), 1024);
    assert_eq!(&digest(&stored), record.actual_digest());

    assert_eq!(pair.log.range(None, None).unwrap(), vec![record]);
}

#[tokio::test]
async fn test_two_cycles_append_two_records() {
    let pair = spawn_pair().await.unwrap();

    let first: VerificationRecord = post(&format!("{}/fetch", pair.consumer))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second: VerificationRecord = post(&format!("{}/fetch", pair.consumer))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(first.timestamp() < second.timestamp());
    assert_ne!(first.expected_digest(), second.expected_digest());

    let all: RecordsResponse = get(&format!("{}/records", pair.consumer))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.count, 2);
    assert_eq!(all.records, vec![first.clone(), second.clone()]);

    let since = second.timestamp().to_rfc3339_opts(SecondsFormat::Nanos, true);
    let later: RecordsResponse = get(&format!("{}/records?since={since}", pair.consumer))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(later.records, vec![second]);

    let until = first.timestamp().to_rfc3339_opts(SecondsFormat::Nanos, true);
    let earlier: RecordsResponse = get(&format!("{}/records?until={until}", pair.consumer))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(earlier.records.is_empty());
}

#[tokio::test]
async fn test_corrupted_transfer_is_logged_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    let log = MemoryLog::new();
    let producer = spawn_tampering_producer().await;
    let consumer = spawn_consumer(&producer, Arc::new(log.clone()), dir.path())
        .await
        .unwrap();

    let resp = post(&format!("{consumer}/fetch")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let record: VerificationRecord = resp.json().await.unwrap();
    assert!(!record.verified());
    assert_eq!(record.status(), VerificationStatus::Failed);
    assert_eq!(record.actual_digest(), &digest(b"what was actually delivered"));
    assert_eq!(log.records(), vec![record]);
}

#[tokio::test]
async fn test_unreachable_producer_is_502_without_record() {
    let dir = tempfile::tempdir().unwrap();
    let log = MemoryLog::new();
    let consumer = spawn_consumer(&dead_url(), Arc::new(log.clone()), dir.path())
        .await
        .unwrap();

    let resp = post(&format!("{consumer}/fetch")).await.unwrap();
    assert_eq!(resp.status(), 502);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "metadata_unavailable");
    assert!(body.record.is_none());
    assert!(log.records().is_empty());
}

#[tokio::test]
async fn test_log_outage_reports_unlogged_record() {
    let dir = tempfile::tempdir().unwrap();
    let producer = spawn_producer(&dir.path().join("serverdata")).await.unwrap();
    let consumer = spawn_consumer(&producer, Arc::new(DownLog), dir.path())
        .await
        .unwrap();

    let resp = post(&format!("{consumer}/fetch")).await.unwrap();
    assert_eq!(resp.status(), 500);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "unlogged");
    let record = body.record.expect("unlogged error carries the record");
    assert_eq!(record.status(), VerificationStatus::Success);
}

#[tokio::test]
async fn test_records_rejects_bad_range() {
    let pair = spawn_pair().await.unwrap();
    let resp = get(&format!("{}/records?since=last-tuesday", pair.consumer))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "bad_request");
}

#[tokio::test]
async fn test_status_page_reflects_last_cycle() {
    let pair = spawn_pair().await.unwrap();

    let page = get(&pair.consumer).await.unwrap().text().await.unwrap();
    assert!(page.contains("No transfer has run yet"));
    assert!(page.contains(&pair.producer));

    post(&format!("{}/fetch", pair.consumer)).await.unwrap();
    let page = get(&pair.consumer).await.unwrap().text().await.unwrap();
    assert!(page.contains("Success"));
    assert!(page.contains("Records logged: 1"));
}

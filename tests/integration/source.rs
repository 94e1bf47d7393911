use crate::*;

use hashdrop_core::digest;
use hashdrop_services::{PayloadSource, SourceError};

#[tokio::test]
async fn test_http_source_against_live_producer() {
    let dir = tempfile::tempdir().unwrap();
    let producer = spawn_producer(dir.path()).await.unwrap();
    let source = HttpPayloadSource::new(&producer, REQUEST_TIMEOUT).unwrap();

    let meta = source.metadata().await.unwrap();
    assert!(meta.digest.is_well_formed());
    let bytes = source.payload(meta.locator.as_ref()).await.unwrap();
    assert_eq!(digest(&bytes), meta.digest);
}

#[tokio::test]
async fn test_http_source_reports_stale_locator_as_status() {
    let dir = tempfile::tempdir().unwrap();
    let producer = spawn_producer(dir.path()).await.unwrap();
    let source = HttpPayloadSource::new(&producer, REQUEST_TIMEOUT).unwrap();

    let first = source.metadata().await.unwrap();
    source.metadata().await.unwrap();

    match source.payload(first.locator.as_ref()).await {
        Err(SourceError::Status { status, .. }) => assert_eq!(status, 409),
        other => panic!("expected 409, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_source_times_out_on_silent_producer() {
    // Accepts connections but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let source = HttpPayloadSource::new(&url, Duration::from_millis(200)).unwrap();
    assert!(matches!(
        source.metadata().await,
        Err(SourceError::Timeout(_))
    ));
}

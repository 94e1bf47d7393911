use crate::*;

use hashdrop_core::wire::{ErrorBody, GenerateResponse};
use hashdrop_core::{digest, Digest};

#[tokio::test]
async fn test_file_before_generate_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let producer = spawn_producer(dir.path()).await.unwrap();

    let resp = get(&format!("{producer}/file")).await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "not_found");
}

#[tokio::test]
async fn test_generate_then_download_matches_checksum() {
    let dir = tempfile::tempdir().unwrap();
    let producer = spawn_producer(dir.path()).await.unwrap();

    let resp = get(&format!("{producer}/generate")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let generated: GenerateResponse = resp.json().await.unwrap();
    assert_eq!(generated.message, "File generated");
    assert_eq!(generated.checksum.len(), 64);
    assert!(generated.locator.is_some());

    let resp = get(&format!("{producer}/file")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"data.txt\""
    );
    let bytes = resp.bytes().await.unwrap();
    assert_eq!(bytes.len(), 1024);
    assert!(bytes.iter().all(|b| b.is_ascii_alphanumeric()));
    assert_eq!(digest(&bytes), Digest::from_hex(generated.checksum.clone()));

    // The on-disk copy holds the same payload.
    let on_disk = std::fs::read(dir.path().join("data.txt")).unwrap();
    assert_eq!(on_disk, bytes.to_vec());
}

#[tokio::test]
async fn test_fetch_is_idempotent_between_generations() {
    let dir = tempfile::tempdir().unwrap();
    let producer = spawn_producer(dir.path()).await.unwrap();
    get(&format!("{producer}/generate")).await.unwrap();

    let a = get(&format!("{producer}/file")).await.unwrap().bytes().await.unwrap();
    let b = get(&format!("{producer}/file")).await.unwrap().bytes().await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_superseded_locator_is_409() {
    let dir = tempfile::tempdir().unwrap();
    let producer = spawn_producer(dir.path()).await.unwrap();

    let first: GenerateResponse = get(&format!("{producer}/generate"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second: GenerateResponse = get(&format!("{producer}/generate"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_ne!(first.checksum, second.checksum);

    let stale = first.locator.unwrap();
    let resp = get(&format!("{producer}/file?locator={stale}")).await.unwrap();
    assert_eq!(resp.status(), 409);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "superseded");

    let current = second.locator.unwrap();
    let resp = get(&format!("{producer}/file?locator={current}")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let bytes = resp.bytes().await.unwrap();
    assert_eq!(digest(&bytes).as_str(), second.checksum);
}

#[tokio::test]
async fn test_producer_health() {
    let dir = tempfile::tempdir().unwrap();
    let producer = spawn_producer(dir.path()).await.unwrap();
    let body: serde_json::Value = get(&format!("{producer}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

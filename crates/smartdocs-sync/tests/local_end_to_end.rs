//! Engine over the directory-backed gateway, configured the way `smartdocs init` does it.

use smartdocs_core::config::SmartdocsConfig;
use smartdocs_core::keys::display_name;
use smartdocs_core::upload::UploadFile;
use smartdocs_sync::{Engine, EngineError, SnapshotDiff};
use tempfile::TempDir;

#[tokio::test]
async fn upload_then_list_from_disk() {
    let tmp = TempDir::new().unwrap();
    let config = SmartdocsConfig::default_config(tmp.path());
    let engine = Engine::connect(&config).await.unwrap();
    assert_eq!(engine.container(), "rawinvoices");
    assert_eq!(engine.gateway_name(), "local:rawinvoices");

    engine.refresh().await.unwrap();
    let empty = engine.snapshot();
    assert!(empty.records.is_empty());
    assert!(empty.last_error.is_none());

    let file = UploadFile::new("fileA.pdf", "application/pdf", vec![7u8; 5 * 1024]);
    let receipt = engine.upload(file).await.unwrap();
    assert!(tmp.path().join("storage/rawinvoices").join(&receipt.key).is_file());

    let snapshot = engine
        .subscribe()
        .wait_for(|s| s.record(&receipt.key).is_some())
        .await
        .unwrap()
        .clone();
    assert_eq!(snapshot.records.len(), 1);
    let record = &snapshot.records[0];
    assert_eq!(display_name(&record.key), "fileA.pdf");
    assert_eq!(record.size_bytes, 5 * 1024);
    assert_eq!(record.access_url, receipt.access_url);

    let diff = SnapshotDiff::between(&empty, &snapshot);
    assert_eq!(diff.added.len(), 1);
    assert!(diff.removed.is_empty());

    let inspected = engine.inspect(&receipt.key).await.unwrap();
    assert_eq!(inspected.size_bytes, 5 * 1024);
}

#[tokio::test]
async fn upload_from_path_guesses_content_type() {
    let tmp = TempDir::new().unwrap();
    let scan = tmp.path().join("receipt.png");
    std::fs::write(&scan, b"\x89PNG\r\n\x1a\n").unwrap();

    let file = UploadFile::from_path(&scan).unwrap();
    assert_eq!(file.content_type, "image/png");

    let config = SmartdocsConfig::default_config(tmp.path());
    let engine = Engine::connect(&config).await.unwrap();
    let receipt = engine.upload(file).await.unwrap();
    assert_eq!(display_name(&receipt.key), "receipt.png");
}

#[tokio::test]
async fn missing_path_is_reported_before_any_call() {
    let tmp = TempDir::new().unwrap();
    let mut config = SmartdocsConfig::default_config(tmp.path());
    config.storage.path = None;

    let err = Engine::connect(&config).await.err().unwrap();
    assert!(matches!(err, EngineError::Configuration(_)));
}

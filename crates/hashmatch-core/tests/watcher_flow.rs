//! Watcher → coordinator: a file written into a watched folder gets digested.

mod common;

use std::time::Duration;

use common::Harness;
use hashmatch_core::control::ShutdownToken;
use hashmatch_core::sources::{DownloadFilter, DownloadWatcher};
use hashmatch_core::Notice;
use tempfile::tempdir;

#[tokio::test]
async fn completed_download_is_detected_and_partials_are_skipped() {
    let dir = tempdir().unwrap();
    let mut h = Harness::start(Duration::from_secs(30));
    let shutdown = ShutdownToken::new();
    let watcher = DownloadWatcher::start(
        &[dir.path().to_path_buf()],
        DownloadFilter::new(&[".iso".to_string()]),
        Duration::from_millis(100),
        h.handle.clone(),
        shutdown.clone(),
    )
    .unwrap();

    std::fs::write(dir.path().join("debian.iso.part"), b"half").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
    std::fs::write(dir.path().join("debian.iso"), b"whole image").unwrap();

    match h.next(Duration::from_secs(10)).await {
        Notice::FileDetected {
            name, size_bytes, ..
        } => {
            assert_eq!(name, "debian.iso");
            assert_eq!(size_bytes, 11);
        }
        other => panic!("expected FileDetected, got {:?}", other),
    }
    h.quiet_for(Duration::from_millis(500)).await;

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), watcher.join())
        .await
        .expect("watcher did not stop");
}

#[tokio::test]
async fn missing_watch_dir_is_created() {
    let root = tempdir().unwrap();
    let nested = root.path().join("Downloads").join("isos");
    let h = Harness::start(Duration::from_secs(30));
    let shutdown = ShutdownToken::new();
    let watcher = DownloadWatcher::start(
        &[nested.clone()],
        DownloadFilter::default(),
        Duration::from_millis(100),
        h.handle.clone(),
        shutdown.clone(),
    )
    .unwrap();
    assert!(nested.is_dir());
    shutdown.trigger();
    watcher.join().await;
}

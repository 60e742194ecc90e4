// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use runner_core::{Event, GroupId};
use tokio::sync::mpsc;

use super::*;
use crate::guard::WriteGuard;

async fn expect_change(rx: &mut mpsc::Receiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("watcher should deliver an event")
        .expect("channel open")
}

#[tokio::test(flavor = "multi_thread")]
async fn external_write_emits_yaml_changed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("openrunner.yaml");
    std::fs::write(&path, "name: app\nprojects: []\n").unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    let guard = WriteGuard::new();
    let _watcher =
        ManifestWatcher::spawn(GroupId::new("grp_a"), &path, guard, tx).unwrap();

    // Let the watcher register before mutating
    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(&path, "name: app\nprojects: []\n# touched\n").unwrap();

    match expect_change(&mut rx).await {
        Event::YamlFileChanged { group_id, file_path } => {
            assert_eq!(group_id, GroupId::new("grp_a"));
            assert_eq!(file_path, path);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn self_write_is_suppressed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("openrunner.yaml");
    std::fs::write(&path, "name: app\nprojects: []\n").unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    let guard = WriteGuard::new();
    let _watcher =
        ManifestWatcher::spawn(GroupId::new("grp_a"), &path, guard.clone(), tx).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    // Simulate the mirror's own write: record, then touch the file
    guard.record(&path);
    std::fs::write(&path, "name: app\nprojects: []\n# self\n").unwrap();

    let suppressed = tokio::time::timeout(Duration::from_millis(800), rx.recv()).await;
    assert!(suppressed.is_err(), "self-write event must be discarded");
}

#[tokio::test(flavor = "multi_thread")]
async fn sibling_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("openrunner.yaml");
    std::fs::write(&path, "name: app\nprojects: []\n").unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    let _watcher =
        ManifestWatcher::spawn(GroupId::new("grp_a"), &path, WriteGuard::new(), tx).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(dir.path().join("README.md"), "hello").unwrap();

    let ignored = tokio::time::timeout(Duration::from_millis(800), rx.recv()).await;
    assert!(ignored.is_err(), "sibling file events must not pass the filename filter");
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use runner_core::{Group, GroupId, LogChunk, LogStream, Project, ProjectId, ProjectKind, Session};
use runner_storage::Database;
use tokio::sync::mpsc;

use super::*;

fn seeded() -> (Database, Session) {
    let db = Database::open_in_memory().unwrap();
    let group_id = GroupId::generate();
    let project = Project {
        id: ProjectId::generate(),
        group_id: group_id.clone(),
        name: "web".into(),
        command: "true".into(),
        kind: ProjectKind::Task,
        auto_restart: false,
        env_vars: HashMap::new(),
        cwd: None,
        interactive: false,
        watch_patterns: Vec::new(),
        auto_start_on_launch: false,
    };
    db.insert_group(&Group {
        id: group_id,
        name: "g".into(),
        directory: "/tmp".into(),
        projects: vec![project.clone()],
        env_vars: HashMap::new(),
        yaml_path: None,
        sync_enabled: false,
    })
    .unwrap();
    let session = db.create_session(&project.id).unwrap();
    (db, session)
}

#[tokio::test]
async fn chunks_are_flushed_in_order() {
    let (db, session) = seeded();
    let (tx, rx) = mpsc::channel(64);
    let writer = spawn_log_writer(db.clone(), rx);

    for i in 0..10 {
        tx.send(LogChunk {
            session_id: session.id.clone(),
            stream: LogStream::Stdout,
            data: format!("chunk-{i};"),
            ts: Utc::now(),
        })
        .await
        .unwrap();
    }
    drop(tx);
    writer.await.unwrap();

    let text = db.get_session_logs_as_string(&session.id).unwrap();
    assert_eq!(
        text,
        "chunk-0;chunk-1;chunk-2;chunk-3;chunk-4;chunk-5;chunk-6;chunk-7;chunk-8;chunk-9;"
    );
}

#[tokio::test]
async fn flush_happens_without_channel_close() {
    let (db, session) = seeded();
    let (tx, rx) = mpsc::channel(64);
    let _writer = spawn_log_writer(db.clone(), rx);

    tx.send(LogChunk {
        session_id: session.id.clone(),
        stream: LogStream::Stderr,
        data: "partial line without newline".into(),
        ts: Utc::now(),
    })
    .await
    .unwrap();

    // Well past the flush interval
    tokio::time::sleep(Duration::from_millis(400)).await;
    let logs = db.get_session_logs(&session.id).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].stream, LogStream::Stderr);
}

#[tokio::test]
async fn unknown_session_batch_is_swallowed() {
    let (db, session) = seeded();
    let (tx, rx) = mpsc::channel(64);
    let _writer = spawn_log_writer(db.clone(), rx);

    // FK-violating chunk: logged and dropped, the writer stays alive
    tx.send(LogChunk {
        session_id: runner_core::SessionId::new("ses_missing"),
        stream: LogStream::Stdout,
        data: "lost".into(),
        ts: Utc::now(),
    })
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    tx.send(LogChunk {
        session_id: session.id.clone(),
        stream: LogStream::Stdout,
        data: "kept".into(),
        ts: Utc::now(),
    })
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let text = db.get_session_logs_as_string(&session.id).unwrap();
    assert_eq!(text, "kept");
}

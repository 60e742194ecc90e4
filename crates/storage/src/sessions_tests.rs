// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use runner_core::{
    ExitStatus, Group, GroupId, LogChunk, LogStream, MetricPoint, Project, ProjectId, ProjectKind,
    SessionId,
};

use crate::db::Database;
use crate::error::StorageError;

fn seeded_db() -> (Database, ProjectId) {
    let db = Database::open_in_memory().unwrap();
    let group_id = GroupId::generate();
    let project = Project {
        id: ProjectId::generate(),
        group_id: group_id.clone(),
        name: "web".into(),
        command: "npm run dev".into(),
        kind: ProjectKind::Service,
        auto_restart: true,
        env_vars: HashMap::new(),
        cwd: None,
        interactive: false,
        watch_patterns: Vec::new(),
        auto_start_on_launch: false,
    };
    let group = Group {
        id: group_id,
        name: "app".into(),
        directory: PathBuf::from("/srv/app"),
        projects: vec![project.clone()],
        env_vars: HashMap::new(),
        yaml_path: None,
        sync_enabled: false,
    };
    db.insert_group(&group).unwrap();
    (db, project.id)
}

fn chunk(session_id: &SessionId, stream: LogStream, data: &str) -> LogChunk {
    LogChunk { session_id: session_id.clone(), stream, data: data.into(), ts: Utc::now() }
}

#[test]
fn session_lifecycle() {
    let (db, project_id) = seeded_db();
    let session = db.create_session(&project_id).unwrap();
    assert!(session.is_open());
    assert_eq!(session.exit_status, ExitStatus::Running);

    db.end_session(&session.id, ExitStatus::Stopped).unwrap();
    let loaded = db.get_session(&session.id).unwrap().unwrap();
    assert!(!loaded.is_open());
    assert_eq!(loaded.exit_status, ExitStatus::Stopped);
    assert!(loaded.ended_at.unwrap() >= loaded.started_at);
}

#[test]
fn end_missing_session_is_not_found() {
    let (db, _) = seeded_db();
    let err = db.end_session(&SessionId::new("ses_missing"), ExitStatus::Stopped).unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[test]
fn log_order_and_concatenation() {
    let (db, project_id) = seeded_db();
    let session = db.create_session(&project_id).unwrap();

    db.insert_logs(&[
        chunk(&session.id, LogStream::Stdout, "hel"),
        chunk(&session.id, LogStream::Stdout, "lo "),
        chunk(&session.id, LogStream::Stderr, "warn\n"),
        chunk(&session.id, LogStream::Stdout, "world\n"),
    ])
    .unwrap();

    let logs = db.get_session_logs(&session.id).unwrap();
    let data: Vec<&str> = logs.iter().map(|c| c.data.as_str()).collect();
    assert_eq!(data, ["hel", "lo ", "warn\n", "world\n"]);

    // String form equals concatenation in insert order
    assert_eq!(db.get_session_logs_as_string(&session.id).unwrap(), "hello warn\nworld\n");
}

#[test]
fn recent_logs_come_from_latest_session_chronologically() {
    let (db, project_id) = seeded_db();
    let old = db.create_session(&project_id).unwrap();
    db.insert_log(&chunk(&old.id, LogStream::Stdout, "old\n")).unwrap();
    db.end_session(&old.id, ExitStatus::Stopped).unwrap();

    let current = db.create_session(&project_id).unwrap();
    for i in 0..5 {
        db.insert_log(&chunk(&current.id, LogStream::Stdout, &format!("line{i}\n"))).unwrap();
    }

    let recent = db.get_recent_logs(&project_id, 3).unwrap();
    let data: Vec<&str> = recent.iter().map(|c| c.data.as_str()).collect();
    assert_eq!(data, ["line2\n", "line3\n", "line4\n"]);
}

#[test]
fn recent_logs_without_sessions_is_empty() {
    let (db, project_id) = seeded_db();
    assert!(db.get_recent_logs(&project_id, 10).unwrap().is_empty());
}

#[test]
fn metrics_roundtrip_and_last_metric() {
    let (db, project_id) = seeded_db();
    let session = db.create_session(&project_id).unwrap();

    for cpu in [1.5f32, 2.5, 70.0] {
        db.insert_metric(&MetricPoint {
            session_id: session.id.clone(),
            ts: Utc::now(),
            cpu,
            memory: 1024 * 1024,
        })
        .unwrap();
    }

    let metrics = db.get_session_metrics(&session.id).unwrap();
    assert_eq!(metrics.len(), 3);
    assert_eq!(metrics[0].cpu, 1.5);

    let last = db.get_last_metric(&session.id).unwrap().unwrap();
    assert_eq!(last.cpu, 70.0);
    assert_eq!(last.memory, 1024 * 1024);
}

#[test]
fn stats_join_counts_logs_and_bytes() {
    let (db, project_id) = seeded_db();
    let session = db.create_session(&project_id).unwrap();
    db.insert_logs(&[
        chunk(&session.id, LogStream::Stdout, "1234"),
        chunk(&session.id, LogStream::Stderr, "56"),
    ])
    .unwrap();
    db.insert_metric(&MetricPoint {
        session_id: session.id.clone(),
        ts: Utc::now(),
        cpu: 1.0,
        memory: 1,
    })
    .unwrap();

    let stats = db.get_project_sessions_with_stats(&project_id).unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].log_count, 2);
    assert_eq!(stats[0].log_size, 6);
    assert_eq!(stats[0].metric_count, 1);
}

#[test]
fn last_completed_skips_running_sessions() {
    let (db, project_id) = seeded_db();
    let done = db.create_session(&project_id).unwrap();
    db.end_session(&done.id, ExitStatus::Errored).unwrap();
    let _running = db.create_session(&project_id).unwrap();

    let last = db.get_last_completed_session(&project_id).unwrap().unwrap();
    assert_eq!(last.id, done.id);
    assert_eq!(last.exit_status, ExitStatus::Errored);
}

#[test]
fn cleanup_all_keeps_running_sessions() {
    let (db, project_id) = seeded_db();
    let done = db.create_session(&project_id).unwrap();
    db.insert_log(&chunk(&done.id, LogStream::Stdout, "x")).unwrap();
    db.end_session(&done.id, ExitStatus::Stopped).unwrap();
    let running = db.create_session(&project_id).unwrap();

    let removed = db.cleanup_all_sessions().unwrap();
    assert_eq!(removed, 1);

    let totals = db.storage_totals().unwrap();
    assert_eq!(totals.session_count, 1);
    assert_eq!(totals.log_count, 0, "logs cascade with their session");
    assert!(db.get_session(&running.id).unwrap().is_some());
}

#[test]
fn cleanup_old_sessions_respects_cutoff() {
    let (db, project_id) = seeded_db();
    let recent = db.create_session(&project_id).unwrap();
    db.end_session(&recent.id, ExitStatus::Stopped).unwrap();

    // A session that just ended is younger than any positive cutoff
    assert_eq!(db.cleanup_old_sessions(1).unwrap(), 0);
    assert_eq!(db.cleanup_old_sessions(0).unwrap(), 1);
}

#[test]
fn delete_session_cascades_logs_and_metrics() {
    let (db, project_id) = seeded_db();
    let session = db.create_session(&project_id).unwrap();
    db.insert_log(&chunk(&session.id, LogStream::Stdout, "x")).unwrap();
    db.insert_metric(&MetricPoint {
        session_id: session.id.clone(),
        ts: Utc::now(),
        cpu: 0.0,
        memory: 0,
    })
    .unwrap();

    db.delete_session(&session.id).unwrap();
    let totals = db.storage_totals().unwrap();
    assert_eq!(totals.session_count, 0);
    assert_eq!(totals.log_count, 0);
    assert_eq!(totals.metric_count, 0);
}

#[test]
fn clear_project_logs_spans_sessions() {
    let (db, project_id) = seeded_db();
    let a = db.create_session(&project_id).unwrap();
    db.insert_log(&chunk(&a.id, LogStream::Stdout, "a")).unwrap();
    db.end_session(&a.id, ExitStatus::Stopped).unwrap();
    let b = db.create_session(&project_id).unwrap();
    db.insert_log(&chunk(&b.id, LogStream::Stdout, "b")).unwrap();

    db.clear_project_logs(&project_id).unwrap();
    assert!(db.get_session_logs(&a.id).unwrap().is_empty());
    assert!(db.get_session_logs(&b.id).unwrap().is_empty());
    // Sessions themselves survive
    assert_eq!(db.get_project_sessions(&project_id).unwrap().len(), 2);
}

#[test]
fn crash_recovery_marks_open_sessions_errored() {
    let (db, project_id) = seeded_db();
    let open = db.create_session(&project_id).unwrap();
    let done = db.create_session(&project_id).unwrap();
    db.end_session(&done.id, ExitStatus::Stopped).unwrap();

    assert_eq!(db.mark_open_sessions_errored().unwrap(), 1);
    let loaded = db.get_session(&open.id).unwrap().unwrap();
    assert_eq!(loaded.exit_status, ExitStatus::Errored);
    assert!(!loaded.is_open());
}

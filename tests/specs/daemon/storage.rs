//! Storage maintenance specs.

use std::time::{Duration, Instant};

use crate::prelude::*;

#[test]
fn cleanup_all_removes_only_completed_sessions() {
    let daemon = Daemon::launch();
    let mut client = daemon.client();

    let group = expect_group(client.request(&Request::GroupCreate {
        name: "app".into(),
        directory: daemon.work_path().to_path_buf(),
        sync_enabled: false,
    }));
    let task = expect_project(client.request(&Request::ProjectCreate {
        group_id: group.id.clone(),
        spec: task_spec("short", "printf done"),
    }));
    let service = expect_project(client.request(&Request::ProjectCreate {
        group_id: group.id.clone(),
        spec: service_spec("long", "sleep 60"),
    }));

    for project in [&task, &service] {
        assert_eq!(
            client.request(&Request::ProcessStart {
                group_id: group.id.clone(),
                project_id: project.id.clone(),
                cols: None,
                rows: None,
            }),
            Response::Ok
        );
    }

    // Wait out the task
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let sessions =
            expect_sessions(client.request(&Request::SessionList { project_id: task.id.clone() }));
        if sessions.first().is_some_and(|s| !s.is_open()) {
            break;
        }
        assert!(Instant::now() < deadline, "task did not finish");
        std::thread::sleep(Duration::from_millis(100));
    }

    match client.request(&Request::StorageCleanupAll) {
        Response::Cleaned { sessions_removed } => assert_eq!(sessions_removed, 1),
        other => panic!("unexpected: {other:?}"),
    }

    // Only the running session is left, with zero logs attached to it
    match client.request(&Request::StorageStats) {
        Response::StorageStats { stats } => {
            assert_eq!(stats.session_count, 1);
        }
        other => panic!("unexpected: {other:?}"),
    }
    let remaining = expect_sessions(
        client.request(&Request::SessionList { project_id: service.id.clone() }),
    );
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].is_open());

    assert_eq!(
        client.request(&Request::ProcessStop { project_id: service.id.clone() }),
        Response::Ok
    );
    daemon.shutdown();
}

#[test]
fn recent_logs_come_back_chronological() {
    let daemon = Daemon::launch();
    let mut client = daemon.client();

    let group = expect_group(client.request(&Request::GroupCreate {
        name: "app".into(),
        directory: daemon.work_path().to_path_buf(),
        sync_enabled: false,
    }));
    let task = expect_project(client.request(&Request::ProjectCreate {
        group_id: group.id.clone(),
        spec: task_spec("counter", "for i in 1 2 3 4 5; do echo line-$i; done"),
    }));
    client.request(&Request::ProcessStart {
        group_id: group.id.clone(),
        project_id: task.id.clone(),
        cols: None,
        rows: None,
    });

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let sessions =
            expect_sessions(client.request(&Request::SessionList { project_id: task.id.clone() }));
        if sessions.first().is_some_and(|s| !s.is_open()) {
            break;
        }
        assert!(Instant::now() < deadline);
        std::thread::sleep(Duration::from_millis(100));
    }
    std::thread::sleep(Duration::from_millis(300));

    match client.request(&Request::SessionRecentLogs { project_id: task.id.clone(), limit: 50 }) {
        Response::Logs { logs } => {
            let text: String = logs.iter().map(|c| c.data.as_str()).collect();
            let first = text.find("line-1").expect("line-1 present");
            let last = text.find("line-5").expect("line-5 present");
            assert!(first < last, "chronological order");
        }
        other => panic!("unexpected: {other:?}"),
    }

    daemon.shutdown();
}

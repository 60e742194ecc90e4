//! Daemon lifecycle specs: readiness, clean shutdown, orphan reaping.

use std::time::Duration;

use crate::prelude::*;

#[test]
fn ready_daemon_answers_ping_and_hello() {
    let daemon = Daemon::launch();
    let mut client = daemon.client();

    assert_eq!(client.request(&Request::Ping), Response::Pong);
    match client.request(&Request::Hello { version: "spec".into() }) {
        Response::Hello { version } => assert!(!version.is_empty()),
        other => panic!("unexpected: {other:?}"),
    }
    daemon.shutdown();
}

#[test]
fn clean_shutdown_stops_children_and_truncates_ledger() {
    let daemon = Daemon::launch();
    let mut client = daemon.client();

    let group = expect_group(client.request(&Request::GroupCreate {
        name: "app".into(),
        directory: daemon.work_path().to_path_buf(),
        sync_enabled: false,
    }));
    let project = expect_project(client.request(&Request::ProjectCreate {
        group_id: group.id.clone(),
        spec: service_spec("sleeper", "sleep 60"),
    }));
    assert_eq!(
        client.request(&Request::ProcessStart {
            group_id: group.id.clone(),
            project_id: project.id.clone(),
            cols: None,
            rows: None,
        }),
        Response::Ok
    );

    let pids = daemon.ledger_pids();
    assert_eq!(pids.len(), 1, "running root pid is in the ledger");
    let pid = pids[0];
    assert!(pid_alive(pid));

    let ledger = daemon.ledger_path();
    daemon.shutdown();

    assert_eq!(std::fs::read_to_string(&ledger).unwrap_or_default(), "");
    assert!(!pid_alive(pid), "no child survives the supervisor");
}

#[test]
fn hard_killed_daemon_leaves_no_running_pid_after_restart() {
    let daemon = Daemon::launch();
    let mut client = daemon.client();

    let group = expect_group(client.request(&Request::GroupCreate {
        name: "app".into(),
        directory: daemon.work_path().to_path_buf(),
        sync_enabled: false,
    }));
    let project = expect_project(client.request(&Request::ProjectCreate {
        group_id: group.id.clone(),
        spec: service_spec("sleeper", "sleep 300"),
    }));
    client.request(&Request::ProcessStart {
        group_id: group.id.clone(),
        project_id: project.id.clone(),
        cols: None,
        rows: None,
    });
    let pid = daemon.ledger_pids()[0];
    assert!(pid_alive(pid));

    // Hard kill: no shutdown pass, the ledger keeps the pid
    let (state_dir, work_dir) = daemon.kill_hard();
    assert!(!std::fs::read_to_string(state_dir.path().join("runner.pids"))
        .unwrap_or_default()
        .is_empty());

    // Restart reaps before anything else; READY implies the reap is done
    let restarted = Daemon::launch_in(state_dir, work_dir);
    std::thread::sleep(Duration::from_millis(200));
    assert!(!pid_alive(pid), "orphan from the previous run is gone");
    assert_eq!(restarted.ledger_pids(), Vec::<u32>::new());

    // The crashed run's session is finalized as errored
    let mut client = restarted.client();
    let sessions = expect_sessions(client.request(&Request::SessionList {
        project_id: project.id.clone(),
    }));
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].exit_status, runner_core::ExitStatus::Errored);

    restarted.shutdown();
}

#[test]
fn second_daemon_on_same_state_dir_is_rejected() {
    let daemon = Daemon::launch();

    let bin = assert_cmd::cargo::cargo_bin("runnerd");
    let output = std::process::Command::new(bin)
        .env("RUNNER_STATE_DIR", daemon.state_path())
        .output()
        .expect("spawn second daemon");
    assert!(!output.status.success(), "the lock file admits one daemon");

    daemon.shutdown();
}

//! Process supervision specs over the wire.

use std::time::{Duration, Instant};

use crate::prelude::*;

fn setup(daemon: &Daemon, spec: ProjectSpec) -> (Client, runner_core::Group, runner_core::Project) {
    let mut client = daemon.client();
    let group = expect_group(client.request(&Request::GroupCreate {
        name: "app".into(),
        directory: daemon.work_path().to_path_buf(),
        sync_enabled: false,
    }));
    let project = expect_project(client.request(&Request::ProjectCreate {
        group_id: group.id.clone(),
        spec,
    }));
    (client, group, project)
}

fn start(client: &mut Client, group: &runner_core::Group, project: &runner_core::Project) {
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

#[test]
fn task_completes_and_logs_are_queryable() {
    let daemon = Daemon::launch();
    let (mut client, group, project) =
        setup(&daemon, task_spec("hello", "printf spec-marker-output"));
    start(&mut client, &group, &project);

    // Poll until the single session finalizes
    let deadline = Instant::now() + Duration::from_secs(10);
    let session = loop {
        let sessions =
            expect_sessions(client.request(&Request::SessionList { project_id: project.id.clone() }));
        if let Some(session) = sessions.first() {
            if !session.is_open() {
                break session.clone();
            }
        }
        assert!(Instant::now() < deadline, "task never finalized");
        std::thread::sleep(Duration::from_millis(100));
    };
    assert_eq!(session.exit_status, runner_core::ExitStatus::Stopped);

    // Batched log writer may still be flushing
    std::thread::sleep(Duration::from_millis(300));
    match client.request(&Request::SessionLogs { session_id: session.id.clone() }) {
        Response::LogText { text } => assert!(text.contains("spec-marker-output"), "got {text:?}"),
        other => panic!("unexpected: {other:?}"),
    }

    daemon.shutdown();
}

#[test]
fn fast_failing_service_cycles_sessions() {
    let daemon = Daemon::launch();
    let mut spec = service_spec("crashy", "false");
    spec.auto_restart = true;
    let (mut client, group, project) = setup(&daemon, spec);
    start(&mut client, &group, &project);

    std::thread::sleep(Duration::from_secs(3));
    let sessions =
        expect_sessions(client.request(&Request::SessionList { project_id: project.id.clone() }));
    assert!(sessions.len() >= 3, "restart loop produced {} sessions", sessions.len());
    for session in sessions.iter().filter(|s| !s.is_open()) {
        let duration = session.ended_at.unwrap() - session.started_at;
        assert!(duration.num_seconds() <= 1, "crash sessions stay short");
    }

    assert_eq!(
        client.request(&Request::ProcessStop { project_id: project.id.clone() }),
        Response::Ok
    );
    daemon.shutdown();
}

#[test]
fn term_ignoring_child_is_forced_out_after_grace() {
    let daemon = Daemon::launch();
    let (mut client, group, project) = setup(
        &daemon,
        service_spec("stubborn", "trap '' TERM; while :; do sleep 1; done"),
    );
    start(&mut client, &group, &project);
    std::thread::sleep(Duration::from_millis(500));

    let stopped_at = Instant::now();
    assert_eq!(
        client.request(&Request::ProcessStop { project_id: project.id.clone() }),
        Response::Ok
    );
    let elapsed = stopped_at.elapsed();
    assert!(elapsed >= Duration::from_secs(5), "force kill waits the full grace window");
    assert!(elapsed < Duration::from_secs(7));

    let sessions =
        expect_sessions(client.request(&Request::SessionList { project_id: project.id.clone() }));
    // User-initiated stop: stopped, not errored, despite the kill
    assert_eq!(sessions[0].exit_status, runner_core::ExitStatus::Stopped);
    let duration = sessions[0].ended_at.unwrap() - sessions[0].started_at;
    assert!(duration.num_seconds() >= 5);

    daemon.shutdown();
}

#[test]
fn interactive_project_round_trips_stdin() {
    let daemon = Daemon::launch();
    let mut spec = service_spec("cat", "cat");
    spec.interactive = true;
    let (mut client, group, project) = setup(&daemon, spec);

    let events = daemon.client().subscribe();
    let mut events = events;

    assert_eq!(
        client.request(&Request::ProcessStart {
            group_id: group.id.clone(),
            project_id: project.id.clone(),
            cols: Some(80),
            rows: Some(24),
        }),
        Response::Ok
    );
    std::thread::sleep(Duration::from_millis(500));

    assert_eq!(
        client.request(&Request::ProcessWriteStdin {
            project_id: project.id.clone(),
            data: "hi from the spec\n".into(),
        }),
        Response::Ok
    );

    let project_id = project.id.clone();
    let log = events.wait_for(Duration::from_secs(5), |event| {
        matches!(
            event,
            Event::ProcessLog { project_id: pid, data, .. }
                if pid == &project_id && data.contains("hi from the spec")
        )
    });
    assert!(log.is_some(), "PTY output reaches subscribers");

    // Resize: accepted, no error, no status change
    assert_eq!(
        client.request(&Request::ProcessResizePty {
            project_id: project.id.clone(),
            cols: 120,
            rows: 40,
        }),
        Response::Ok
    );

    assert_eq!(
        client.request(&Request::ProcessStop { project_id: project.id.clone() }),
        Response::Ok
    );
    daemon.shutdown();
}

#[test]
fn restart_of_stopped_project_starts_fresh() {
    let daemon = Daemon::launch();
    let (mut client, group, project) = setup(&daemon, service_spec("svc", "sleep 60"));
    // Never started; restart should fall through to a fresh start
    let _ = group;
    assert_eq!(
        client.request(&Request::ProcessRestart { project_id: project.id.clone() }),
        Response::Ok
    );
    std::thread::sleep(Duration::from_millis(300));
    let sessions =
        expect_sessions(client.request(&Request::SessionList { project_id: project.id.clone() }));
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].is_open());

    daemon.shutdown();
}

//! YAML mirror specs: self-write suppression and external-change events.

use std::io::Write;
use std::time::Duration;

use crate::prelude::*;

#[test]
fn own_writes_are_suppressed_external_writes_are_not() {
    let daemon = Daemon::launch();
    let mut client = daemon.client();

    let group = expect_group(client.request(&Request::GroupCreate {
        name: "app".into(),
        directory: daemon.work_path().to_path_buf(),
        sync_enabled: true,
    }));
    let yaml_path = daemon.work_path().join("openrunner.yaml");
    assert!(yaml_path.exists());

    let mut events = daemon.client().subscribe();

    // The rename rewrites the manifest; the watcher must swallow the echo
    expect_group(
        client.request(&Request::GroupRename { group_id: group.id.clone(), name: "newer".into() }),
    );
    let suppressed = events.wait_for(Duration::from_secs(1), |event| {
        matches!(event, Event::YamlFileChanged { .. })
    });
    assert!(suppressed.is_none(), "self-write produced a YamlFileChanged event");

    // Past the suppression window, an external edit must surface
    std::thread::sleep(Duration::from_millis(600));
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&yaml_path)
        .expect("open manifest");
    writeln!(file, "# touched outside the app").expect("append");
    drop(file);

    let observed = events.wait_for(Duration::from_secs(5), |event| {
        matches!(
            event,
            Event::YamlFileChanged { group_id, .. } if group_id == &group.id
        )
    });
    assert!(observed.is_some(), "external edit must emit YamlFileChanged");

    daemon.shutdown();
}

#[test]
fn reload_over_the_wire_applies_and_announces() {
    let daemon = Daemon::launch();
    let mut client = daemon.client();

    let group = expect_group(client.request(&Request::GroupCreate {
        name: "app".into(),
        directory: daemon.work_path().to_path_buf(),
        sync_enabled: true,
    }));
    expect_project(client.request(&Request::ProjectCreate {
        group_id: group.id.clone(),
        spec: service_spec("web", "npm run dev"),
    }));

    // External revision: same project name, different command
    std::fs::write(
        daemon.work_path().join("openrunner.yaml"),
        "version: \"1.0\"\nname: app\nprojects:\n  - name: web\n    command: npm run start\n",
    )
    .expect("rewrite manifest");

    let mut events = daemon.client().subscribe();
    let reloaded =
        expect_group(client.request(&Request::GroupReload { group_id: group.id.clone() }));
    assert_eq!(reloaded.projects[0].command, "npm run start");

    let announced = events.wait_for(Duration::from_secs(2), |event| {
        matches!(event, Event::ConfigReloaded { .. })
    });
    assert!(announced.is_some());

    daemon.shutdown();
}

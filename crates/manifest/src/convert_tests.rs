// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use runner_core::ProjectKind;

use super::*;
use crate::schema::MANIFEST_VERSION;

fn sample_manifest() -> Manifest {
    Manifest {
        version: MANIFEST_VERSION.into(),
        name: "app".into(),
        env_vars: HashMap::from([("NODE_ENV".into(), "development".into())]),
        projects: vec![
            ManifestProject {
                name: "web".into(),
                command: "npm run dev".into(),
                kind: ProjectKind::Service,
                auto_restart: true,
                cwd: Some("packages/web".into()),
                interactive: false,
                env_vars: HashMap::new(),
                watch_patterns: vec!["**/*.ts".into()],
                auto_start_on_launch: true,
            },
            ManifestProject {
                name: "migrate".into(),
                command: "npm run migrate".into(),
                kind: ProjectKind::Task,
                auto_restart: false,
                cwd: None,
                interactive: false,
                env_vars: HashMap::new(),
                watch_patterns: Vec::new(),
                auto_start_on_launch: false,
            },
        ],
    }
}

#[test]
fn to_group_mints_fresh_ids_and_enables_sync() {
    let manifest = sample_manifest();
    let dir = Path::new("/srv/app");
    let yaml = Path::new("/srv/app/openrunner.yaml");

    let group = to_group(&manifest, dir, yaml);
    assert_eq!(group.name, "app");
    assert_eq!(group.directory, dir);
    assert_eq!(group.yaml_path.as_deref(), Some(yaml));
    assert!(group.sync_enabled);
    assert_eq!(group.projects.len(), 2);
    assert!(group.projects.iter().all(|p| p.group_id == group.id));
    assert_ne!(group.projects[0].id, group.projects[1].id);
    assert_eq!(group.projects[0].cwd.as_deref(), Some(Path::new("packages/web")));
}

#[test]
fn from_group_to_group_roundtrip_modulo_ids() {
    let manifest = sample_manifest();
    let group = to_group(&manifest, Path::new("/srv/app"), Path::new("/srv/app/openrunner.yaml"));
    assert_eq!(from_group(&group), manifest);
}

#[test]
fn apply_preserves_ids_by_name() {
    let manifest = sample_manifest();
    let existing =
        to_group(&manifest, Path::new("/srv/app"), Path::new("/srv/app/openrunner.yaml"));
    let web_id = existing.project_by_name("web").unwrap().id.clone();

    // Same names, changed command: ids survive
    let mut updated = manifest.clone();
    updated.projects[0].command = "npm run start".into();
    let merged = apply_to_group(&existing, &updated, Path::new("/srv/app"));
    assert_eq!(merged.id, existing.id);
    assert_eq!(merged.project_by_name("web").unwrap().id, web_id);
    assert_eq!(merged.project_by_name("web").unwrap().command, "npm run start");
}

#[test]
fn apply_drops_missing_names_and_mints_new_ones() {
    let manifest = sample_manifest();
    let existing =
        to_group(&manifest, Path::new("/srv/app"), Path::new("/srv/app/openrunner.yaml"));
    let old_ids: Vec<_> = existing.projects.iter().map(|p| p.id.clone()).collect();

    let mut updated = manifest.clone();
    updated.projects.remove(1); // drop "migrate"
    updated.projects.push(ManifestProject {
        name: "jobs".into(),
        command: "npm run jobs".into(),
        kind: ProjectKind::Service,
        auto_restart: true,
        cwd: None,
        interactive: false,
        env_vars: HashMap::new(),
        watch_patterns: Vec::new(),
        auto_start_on_launch: false,
    });

    let merged = apply_to_group(&existing, &updated, Path::new("/srv/app"));
    let names: Vec<&str> = merged.projects.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["web", "jobs"]);
    let jobs_id = &merged.project_by_name("jobs").unwrap().id;
    assert!(!old_ids.contains(jobs_id));
}

#[test]
fn apply_is_identity_when_nothing_changed() {
    let manifest = sample_manifest();
    let existing =
        to_group(&manifest, Path::new("/srv/app"), Path::new("/srv/app/openrunner.yaml"));
    let merged = apply_to_group(&existing, &manifest, Path::new("/srv/app"));
    assert_eq!(merged, existing);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::project::ProjectKind;

fn group_with_projects(names: &[&str]) -> Group {
    let gid = GroupId::new("grp_g1");
    Group {
        id: gid.clone(),
        name: "app".into(),
        directory: PathBuf::from("/srv/app"),
        projects: names
            .iter()
            .map(|n| Project {
                id: ProjectId::new(format!("prj_{n}")),
                group_id: gid.clone(),
                name: (*n).into(),
                command: "true".into(),
                kind: ProjectKind::Service,
                auto_restart: true,
                env_vars: HashMap::new(),
                cwd: None,
                interactive: false,
                watch_patterns: Vec::new(),
                auto_start_on_launch: false,
            })
            .collect(),
        env_vars: HashMap::new(),
        yaml_path: None,
        sync_enabled: false,
    }
}

#[test]
fn project_lookup_by_id_and_name() {
    let g = group_with_projects(&["web", "api"]);
    assert_eq!(g.project(&ProjectId::new("prj_api")).map(|p| p.name.as_str()), Some("api"));
    assert_eq!(g.project_by_name("web").map(|p| p.id.as_str()), Some("prj_web"));
    assert!(g.project(&ProjectId::new("prj_missing")).is_none());
    assert!(g.project_by_name("worker").is_none());
}

#[test]
fn group_json_roundtrip() {
    let g = group_with_projects(&["web"]);
    let json = serde_json::to_string(&g).unwrap();
    let parsed: Group = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, g);
}

#[test]
fn projects_preserve_insertion_order() {
    let g = group_with_projects(&["c", "a", "b"]);
    let names: Vec<_> = g.projects.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["c", "a", "b"]);
}

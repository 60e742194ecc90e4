// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Group ⇄ manifest conversion.
//!
//! `to_group` mints fresh ids (YAML import). `apply_to_group` preserves ids
//! by matching manifest entries to existing projects by name; names that
//! disappear are dropped, new names get fresh ids.

use std::path::{Path, PathBuf};

use runner_core::{Group, GroupId, Project, ProjectId};

use crate::schema::{Manifest, ManifestProject, MANIFEST_VERSION};

/// Build a brand-new group from a parsed manifest.
pub fn to_group(manifest: &Manifest, dir: &Path, yaml_path: &Path) -> Group {
    let group_id = GroupId::generate();
    let projects = manifest
        .projects
        .iter()
        .map(|entry| project_from_entry(entry, ProjectId::generate(), &group_id))
        .collect();
    Group {
        id: group_id,
        name: manifest.name.clone(),
        directory: dir.to_path_buf(),
        projects,
        env_vars: manifest.env_vars.clone(),
        yaml_path: Some(yaml_path.to_path_buf()),
        sync_enabled: true,
    }
}

/// Merge a re-parsed manifest into an existing group, keeping project ids
/// stable wherever the project name still appears.
pub fn apply_to_group(existing: &Group, manifest: &Manifest, dir: &Path) -> Group {
    let projects = manifest
        .projects
        .iter()
        .map(|entry| {
            let id = existing
                .project_by_name(&entry.name)
                .map(|p| p.id.clone())
                .unwrap_or_else(ProjectId::generate);
            project_from_entry(entry, id, &existing.id)
        })
        .collect();
    Group {
        id: existing.id.clone(),
        name: manifest.name.clone(),
        directory: dir.to_path_buf(),
        projects,
        env_vars: manifest.env_vars.clone(),
        yaml_path: existing.yaml_path.clone(),
        sync_enabled: existing.sync_enabled,
    }
}

/// Project a group into its on-disk form.
pub fn from_group(group: &Group) -> Manifest {
    Manifest {
        version: MANIFEST_VERSION.to_string(),
        name: group.name.clone(),
        env_vars: group.env_vars.clone(),
        projects: group
            .projects
            .iter()
            .map(|p| ManifestProject {
                name: p.name.clone(),
                command: p.command.clone(),
                kind: p.kind,
                auto_restart: p.auto_restart,
                cwd: p.cwd.as_deref().map(|c| c.to_string_lossy().into_owned()),
                interactive: p.interactive,
                env_vars: p.env_vars.clone(),
                watch_patterns: p.watch_patterns.clone(),
                auto_start_on_launch: p.auto_start_on_launch,
            })
            .collect(),
    }
}

fn project_from_entry(entry: &ManifestProject, id: ProjectId, group_id: &GroupId) -> Project {
    Project {
        id,
        group_id: group_id.clone(),
        name: entry.name.clone(),
        command: entry.command.clone(),
        kind: entry.kind,
        auto_restart: entry.auto_restart,
        env_vars: entry.env_vars.clone(),
        cwd: entry.cwd.as_deref().map(PathBuf::from),
        interactive: entry.interactive,
        watch_patterns: entry.watch_patterns.clone(),
        auto_start_on_launch: entry.auto_start_on_launch,
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Group command handlers, including the YAML sync surface.

use std::collections::HashMap;
use std::sync::Arc;

use runner_core::{Event, Group, GroupId};
use runner_manifest as manifest;
use runner_wire::{ErrorKind, Request, Response};
use tracing::info;

use super::{manifest_error, storage_error, ListenCtx};

pub(super) async fn handle(ctx: &Arc<ListenCtx>, request: Request) -> Response {
    match request {
        Request::GroupList => match ctx.db.list_groups() {
            Ok(groups) => Response::Groups { groups },
            Err(e) => storage_error(e),
        },

        Request::GroupCreate { name, directory, sync_enabled } => {
            let group = Group {
                id: GroupId::generate(),
                name,
                directory: directory.clone(),
                projects: Vec::new(),
                env_vars: HashMap::new(),
                yaml_path: sync_enabled.then(|| directory.join(manifest::FILE_NAME)),
                sync_enabled,
            };
            if let Err(e) = ctx.db.insert_group(&group) {
                return storage_error(e);
            }
            if sync_enabled {
                ctx.sync_write(&group);
                ctx.spawn_yaml_watcher(&group);
            }
            Response::Group { group: Box::new(group) }
        }

        Request::GroupRename { group_id, name } => {
            if let Err(e) = ctx.db.rename_group(&group_id, &name) {
                return storage_error(e);
            }
            refreshed(ctx, &group_id)
        }

        Request::GroupSetDirectory { group_id, directory } => {
            if let Err(e) = ctx.db.update_group_directory(&group_id, &directory) {
                return storage_error(e);
            }
            refreshed(ctx, &group_id)
        }

        Request::GroupSetEnv { group_id, env_vars } => {
            if let Err(e) = ctx.db.update_group_env_vars(&group_id, &env_vars) {
                return storage_error(e);
            }
            refreshed(ctx, &group_id)
        }

        Request::GroupDelete { group_id } => {
            let group = match ctx.db.get_group(&group_id) {
                Ok(group) => group,
                Err(e) => return storage_error(e),
            };
            // All processes stop before the rows go away
            for project in &group.projects {
                let _ = ctx.supervisor.stop(&project.id).await;
            }
            ctx.drop_yaml_watcher(&group_id);
            match ctx.db.delete_group(&group_id) {
                Ok(()) => Response::Ok,
                Err(e) => storage_error(e),
            }
        }

        Request::GroupToggleSync { group_id, enabled } => toggle_sync(ctx, group_id, enabled),

        Request::GroupReload { group_id } => reload_from_yaml(ctx, group_id).await,

        Request::GroupExport { group_id, file_path } => {
            let group = match ctx.db.get_group(&group_id) {
                Ok(group) => group,
                Err(e) => return storage_error(e),
            };
            match manifest::write(&group, &file_path, &ctx.guard) {
                Ok(()) => Response::Path { path: file_path },
                Err(e) => manifest_error(e),
            }
        }

        Request::GroupImport { file_path } => {
            let parsed = match manifest::parse(&file_path) {
                Ok(parsed) => parsed,
                Err(e) => return manifest_error(e),
            };
            let dir = file_path
                .parent()
                .map(std::path::Path::to_path_buf)
                .unwrap_or_else(|| std::path::PathBuf::from("."));
            let group = manifest::to_group(&parsed, &dir, &file_path);
            if let Err(e) = ctx.db.insert_group(&group) {
                return storage_error(e);
            }
            ctx.spawn_yaml_watcher(&group);
            info!(group = %group.id, file = %file_path.display(), "imported group from YAML");
            publish_reload(ctx).await;
            Response::Group { group: Box::new(group) }
        }

        other => unreachable!("non-group request routed to groups: {other:?}"),
    }
}

/// Re-read the group, mirror it if synced, and return it.
fn refreshed(ctx: &Arc<ListenCtx>, group_id: &GroupId) -> Response {
    match ctx.db.get_group(group_id) {
        Ok(group) => {
            ctx.sync_write(&group);
            Response::Group { group: Box::new(group) }
        }
        Err(e) => storage_error(e),
    }
}

fn toggle_sync(ctx: &Arc<ListenCtx>, group_id: GroupId, enabled: bool) -> Response {
    let mut group = match ctx.db.get_group(&group_id) {
        Ok(group) => group,
        Err(e) => return storage_error(e),
    };

    if enabled {
        let path = group
            .yaml_path
            .clone()
            .unwrap_or_else(|| group.directory.join(manifest::FILE_NAME));
        group.yaml_path = Some(path.clone());
        group.sync_enabled = true;
        // Write before persisting: a sync-enabled group must have its file
        if let Err(e) = manifest::write(&group, &path, &ctx.guard) {
            return manifest_error(e);
        }
        if let Err(e) = ctx.db.update_group_sync(&group_id, Some(path.as_path()), true) {
            return storage_error(e);
        }
        ctx.spawn_yaml_watcher(&group);
    } else {
        group.sync_enabled = false;
        // The path is kept so re-enabling picks the same file back up
        if let Err(e) = ctx.db.update_group_sync(&group_id, group.yaml_path.as_deref(), false) {
            return storage_error(e);
        }
        ctx.drop_yaml_watcher(&group_id);
    }
    Response::Group { group: Box::new(group) }
}

/// Reload the group from its YAML file: parse first (a parse error leaves
/// everything untouched), stop projects the new revision drops, then
/// replace and announce.
async fn reload_from_yaml(ctx: &Arc<ListenCtx>, group_id: GroupId) -> Response {
    let existing = match ctx.db.get_group(&group_id) {
        Ok(group) => group,
        Err(e) => return storage_error(e),
    };
    let Some(yaml_path) = existing.yaml_path.clone() else {
        return Response::error(
            ErrorKind::Conflict,
            format!("group {group_id} has no YAML file to reload from"),
        );
    };

    let parsed = match manifest::parse(&yaml_path) {
        Ok(parsed) => parsed,
        Err(e) => return manifest_error(e),
    };
    let merged = manifest::apply_to_group(&existing, &parsed, &existing.directory);

    // Stop-then-replace: anything running that the new revision no longer
    // contains is stopped before its rows disappear.
    for project in &existing.projects {
        let survives = merged.projects.iter().any(|p| p.id == project.id);
        if !survives {
            let _ = ctx.supervisor.stop(&project.id).await;
        }
    }

    if let Err(e) = ctx.db.replace_group(&merged) {
        return storage_error(e);
    }
    info!(group = %group_id, "reloaded group from YAML");
    publish_reload(ctx).await;
    Response::Group { group: Box::new(merged) }
}

async fn publish_reload(ctx: &Arc<ListenCtx>) {
    if let Ok(groups) = ctx.db.list_groups() {
        let _ = ctx.event_tx.send(Event::ConfigReloaded { groups }).await;
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project command handlers.

use std::sync::Arc;

use runner_core::{Project, ProjectId};
use runner_wire::{ProjectSpec, Request, Response};

use super::{storage_error, ListenCtx};

pub(super) async fn handle(ctx: &Arc<ListenCtx>, request: Request) -> Response {
    match request {
        Request::ProjectCreate { group_id, spec } => {
            let group = match ctx.db.get_group(&group_id) {
                Ok(group) => group,
                Err(e) => return storage_error(e),
            };
            let project = project_from_spec(ProjectId::generate(), group_id, spec);
            if let Err(e) = ctx.db.create_project(&project) {
                return storage_error(e);
            }
            resync(ctx, &group.id);
            Response::Project { project: Box::new(project) }
        }

        Request::ProjectUpdate { project_id, spec } => {
            let existing = match ctx.db.get_project(&project_id) {
                Ok(project) => project,
                Err(e) => return storage_error(e),
            };
            let updated = project_from_spec(existing.id, existing.group_id, spec);
            if let Err(e) = ctx.db.update_project(&updated) {
                return storage_error(e);
            }
            // A running actor picks up the new command/watch config for
            // its next respawn and rebuilds its watcher now
            ctx.supervisor.update_project(&updated);
            resync(ctx, &updated.group_id);
            Response::Project { project: Box::new(updated) }
        }

        Request::ProjectDelete { project_id } => {
            let project = match ctx.db.get_project(&project_id) {
                Ok(project) => project,
                Err(e) => return storage_error(e),
            };
            // Process stop is enforced before delete
            let _ = ctx.supervisor.stop(&project_id).await;
            if let Err(e) = ctx.db.delete_project(&project_id) {
                return storage_error(e);
            }
            resync(ctx, &project.group_id);
            Response::Ok
        }

        Request::ProjectDeleteMany { project_ids } => {
            for project_id in &project_ids {
                let _ = ctx.supervisor.stop(project_id).await;
            }
            let groups: Vec<_> = project_ids
                .iter()
                .filter_map(|id| ctx.db.get_project(id).ok().map(|p| p.group_id))
                .collect();
            if let Err(e) = ctx.db.delete_projects(&project_ids) {
                return storage_error(e);
            }
            for group_id in dedup(groups) {
                resync(ctx, &group_id);
            }
            Response::Ok
        }

        Request::ProjectConvertMany { project_ids, kind } => {
            if let Err(e) = ctx.db.convert_projects(&project_ids, kind) {
                return storage_error(e);
            }
            let mut groups = Vec::new();
            for project_id in &project_ids {
                if let Ok(project) = ctx.db.get_project(project_id) {
                    // Running actors tear down watchers when the kind
                    // moves away from service
                    ctx.supervisor.update_project(&project);
                    groups.push(project.group_id);
                }
            }
            for group_id in dedup(groups) {
                resync(ctx, &group_id);
            }
            Response::Ok
        }

        other => unreachable!("non-project request routed to projects: {other:?}"),
    }
}

fn project_from_spec(
    id: ProjectId,
    group_id: runner_core::GroupId,
    spec: ProjectSpec,
) -> Project {
    Project {
        id,
        group_id,
        name: spec.name,
        command: spec.command,
        kind: spec.kind,
        auto_restart: spec.auto_restart,
        env_vars: spec.env_vars,
        cwd: spec.cwd,
        interactive: spec.interactive,
        watch_patterns: spec.watch_patterns,
        auto_start_on_launch: spec.auto_start_on_launch,
    }
}

/// Mirror the owning group after a project mutation.
fn resync(ctx: &Arc<ListenCtx>, group_id: &runner_core::GroupId) {
    if let Ok(group) = ctx.db.get_group(group_id) {
        ctx.sync_write(&group);
    }
}

fn dedup(mut ids: Vec<runner_core::GroupId>) -> Vec<runner_core::GroupId> {
    ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    ids.dedup();
    ids
}

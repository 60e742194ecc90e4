// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process command handlers. These are the only entry points into the
//! supervisor from outside the core.

use std::sync::Arc;

use runner_wire::{Request, Response};

use super::{engine_error, storage_error, ListenCtx};

pub(super) async fn handle(ctx: &Arc<ListenCtx>, request: Request) -> Response {
    match request {
        Request::ProcessStart { group_id, project_id, cols, rows } => {
            let group = match ctx.db.get_group(&group_id) {
                Ok(group) => group,
                Err(e) => return storage_error(e),
            };
            let Some(project) = group.project(&project_id).cloned() else {
                return storage_error(runner_storage::StorageError::NotFound(format!(
                    "project {project_id} in group {group_id}"
                )));
            };
            match ctx.supervisor.start(&group, &project, cols, rows).await {
                Ok(()) => Response::Ok,
                Err(e) => engine_error(e),
            }
        }

        Request::ProcessStop { project_id } => match ctx.supervisor.stop(&project_id).await {
            Ok(()) => Response::Ok,
            Err(e) => engine_error(e),
        },

        Request::ProcessRestart { project_id } => {
            if ctx.supervisor.request_restart(&project_id) {
                return Response::Ok;
            }
            // Not under supervision: a restart of a stopped project is a
            // fresh start from its stored configuration
            let project = match ctx.db.get_project(&project_id) {
                Ok(project) => project,
                Err(e) => return storage_error(e),
            };
            let group = match ctx.db.get_group(&project.group_id) {
                Ok(group) => group,
                Err(e) => return storage_error(e),
            };
            match ctx.supervisor.start(&group, &project, None, None).await {
                Ok(()) => Response::Ok,
                Err(e) => engine_error(e),
            }
        }

        Request::ProcessStatuses => {
            Response::Statuses { statuses: ctx.supervisor.statuses() }
        }

        // Both silently drop when the project is not running (or not a
        // PTY); no error, no event
        Request::ProcessWriteStdin { project_id, data } => {
            ctx.supervisor.write_stdin(&project_id, data);
            Response::Ok
        }

        Request::ProcessResizePty { project_id, cols, rows } => {
            ctx.supervisor.resize_pty(&project_id, cols, rows);
            Response::Ok
        }

        other => unreachable!("non-process request routed to processes: {other:?}"),
    }
}

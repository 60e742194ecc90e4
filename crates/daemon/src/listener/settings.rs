// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settings, detection probes, working-dir resolution, and storage
//! maintenance handlers.

use std::sync::Arc;

use runner_platform::{detect_editor, resolve_shell};
use runner_wire::{ErrorKind, Request, Response, Settings, StorageStats};

use super::{storage_error, ListenCtx};

const KEY_SHELL: &str = "default_shell";
const KEY_EDITOR: &str = "editor";
const KEY_RETENTION: &str = "log_retention_days";

pub(super) async fn handle(ctx: &Arc<ListenCtx>, request: Request) -> Response {
    match request {
        Request::SettingsGet => match read_settings(ctx) {
            Ok(settings) => Response::Settings { settings },
            Err(e) => storage_error(e),
        },

        Request::SettingsUpdate { settings } => {
            let updates = [
                (KEY_SHELL, settings.default_shell.clone()),
                (KEY_EDITOR, settings.editor.clone()),
                (KEY_RETENTION, settings.log_retention_days.map(|d| d.to_string())),
            ];
            for (key, value) in updates {
                let result = match value {
                    Some(value) => ctx.db.set_setting(key, &value),
                    None => Ok(()),
                };
                if let Err(e) = result {
                    return storage_error(e);
                }
            }
            match read_settings(ctx) {
                Ok(settings) => Response::Settings { settings },
                Err(e) => storage_error(e),
            }
        }

        Request::DetectShell => {
            let configured = ctx.db.get_setting(KEY_SHELL).ok().flatten();
            match resolve_shell(configured.as_deref()) {
                Ok(shell) => Response::Shell {
                    shell: shell.program.to_string_lossy().into_owned(),
                },
                Err(e) => Response::error(ErrorKind::Shell, e.to_string()),
            }
        }

        Request::DetectEditor => {
            let editor = match ctx.db.get_setting(KEY_EDITOR) {
                Ok(Some(editor)) => Some(editor),
                _ => detect_editor(),
            };
            Response::Editor { editor }
        }

        Request::ResolveWorkingDir { group_id, project_id } => {
            let group = match ctx.db.get_group(&group_id) {
                Ok(group) => group,
                Err(e) => return storage_error(e),
            };
            match group.project(&project_id) {
                Some(project) => {
                    Response::WorkingDir { path: project.working_dir(&group.directory) }
                }
                None => Response::error(
                    ErrorKind::NotFound,
                    format!("project {project_id} in group {group_id}"),
                ),
            }
        }

        Request::ResolveWorkingDirByProject { project_id } => {
            let project = match ctx.db.get_project(&project_id) {
                Ok(project) => project,
                Err(e) => return storage_error(e),
            };
            match ctx.db.get_group(&project.group_id) {
                Ok(group) => {
                    Response::WorkingDir { path: project.working_dir(&group.directory) }
                }
                Err(e) => storage_error(e),
            }
        }

        Request::StorageStats => match ctx.db.storage_totals() {
            Ok(totals) => Response::StorageStats {
                stats: StorageStats {
                    session_count: totals.session_count,
                    log_count: totals.log_count,
                    log_bytes: totals.log_bytes,
                    metric_count: totals.metric_count,
                    database_size_bytes: totals.database_size_bytes,
                },
            },
            Err(e) => storage_error(e),
        },

        Request::StorageCleanup { days } => match ctx.db.cleanup_old_sessions(days) {
            Ok(removed) => Response::Cleaned { sessions_removed: removed },
            Err(e) => storage_error(e),
        },

        Request::StorageCleanupAll => match ctx.db.cleanup_all_sessions() {
            Ok(removed) => Response::Cleaned { sessions_removed: removed },
            Err(e) => storage_error(e),
        },

        Request::DatabasePath => Response::Path { path: ctx.db.path().to_path_buf() },

        other => unreachable!("non-settings request routed to settings: {other:?}"),
    }
}

fn read_settings(ctx: &Arc<ListenCtx>) -> Result<Settings, runner_storage::StorageError> {
    Ok(Settings {
        default_shell: ctx.db.get_setting(KEY_SHELL)?,
        editor: ctx.db.get_setting(KEY_EDITOR)?,
        log_retention_days: ctx
            .db
            .get_setting(KEY_RETENTION)?
            .and_then(|v| v.parse().ok()),
    })
}

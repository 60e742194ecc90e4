// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session, log, and metric query handlers.

use std::sync::Arc;

use runner_wire::{Request, Response, SessionStats};

use super::{storage_error, ListenCtx};

pub(super) async fn handle(ctx: &Arc<ListenCtx>, request: Request) -> Response {
    match request {
        Request::SessionList { project_id } => {
            match ctx.db.get_project_sessions(&project_id) {
                Ok(sessions) => Response::Sessions { sessions },
                Err(e) => storage_error(e),
            }
        }

        Request::SessionListWithStats { project_id } => {
            match ctx.db.get_project_sessions_with_stats(&project_id) {
                Ok(rows) => Response::SessionsWithStats {
                    sessions: rows
                        .into_iter()
                        .map(|row| SessionStats {
                            session: row.session,
                            log_count: row.log_count,
                            log_size: row.log_size,
                            metric_count: row.metric_count,
                        })
                        .collect(),
                },
                Err(e) => storage_error(e),
            }
        }

        Request::SessionGet { session_id } => match ctx.db.get_session(&session_id) {
            Ok(session) => Response::Session { session: session.map(Box::new) },
            Err(e) => storage_error(e),
        },

        Request::SessionLogs { session_id } => {
            match ctx.db.get_session_logs_as_string(&session_id) {
                Ok(text) => Response::LogText { text },
                Err(e) => storage_error(e),
            }
        }

        Request::SessionMetrics { session_id } => {
            match ctx.db.get_session_metrics(&session_id) {
                Ok(metrics) => Response::Metrics { metrics },
                Err(e) => storage_error(e),
            }
        }

        Request::SessionLastCompleted { project_id } => {
            match ctx.db.get_last_completed_session(&project_id) {
                Ok(session) => Response::Session { session: session.map(Box::new) },
                Err(e) => storage_error(e),
            }
        }

        Request::SessionRecentLogs { project_id, limit } => {
            match ctx.db.get_recent_logs(&project_id, limit) {
                Ok(logs) => Response::Logs { logs },
                Err(e) => storage_error(e),
            }
        }

        Request::SessionLastMetric { session_id } => {
            match ctx.db.get_last_metric(&session_id) {
                Ok(metric) => Response::Metric { metric },
                Err(e) => storage_error(e),
            }
        }

        Request::SessionDelete { session_id } => match ctx.db.delete_session(&session_id) {
            Ok(()) => Response::Ok,
            Err(e) => storage_error(e),
        },

        Request::ProjectLogs { project_id } => {
            // Text of the most recent session, empty when none exists
            let sessions = match ctx.db.get_project_sessions(&project_id) {
                Ok(sessions) => sessions,
                Err(e) => return storage_error(e),
            };
            match sessions.first() {
                Some(latest) => match ctx.db.get_session_logs_as_string(&latest.id) {
                    Ok(text) => Response::LogText { text },
                    Err(e) => storage_error(e),
                },
                None => Response::LogText { text: String::new() },
            }
        }

        Request::ProjectClearLogs { project_id } => {
            match ctx.db.clear_project_logs(&project_id) {
                Ok(()) => Response::Ok,
                Err(e) => storage_error(e),
            }
        }

        other => unreachable!("non-session request routed to sessions: {other:?}"),
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! One task per connection; requests dispatch to the subject handlers and
//! `subscribe` upgrades the connection into a push-event stream. The
//! listener never touches running state directly — everything goes
//! through the supervisor or the stores.

mod groups;
mod processes;
mod projects;
mod sessions;
mod settings;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use runner_core::{Event, Group, GroupId};
use runner_engine::{EngineError, Supervisor};
use runner_manifest::{ManifestError, ManifestWatcher, WriteGuard};
use runner_platform::PlatformError;
use runner_storage::{Database, StorageError};
use runner_wire::{read_message, write_message, ErrorKind, ProtocolError, Request, Response};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::EventBus;
use crate::env::PROTOCOL_VERSION;

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub db: Database,
    pub supervisor: Supervisor,
    pub event_tx: mpsc::Sender<Event>,
    pub bus: EventBus,
    /// Self-write suppression shared with every manifest watcher.
    pub guard: WriteGuard,
    /// One YAML watcher per sync-enabled group.
    pub watchers: Mutex<HashMap<GroupId, ManifestWatcher>>,
    /// Cancelled by a shutdown request; the main loop acts on it.
    pub shutdown: CancellationToken,
}

impl ListenCtx {
    /// Start (or replace) the group's manifest watcher.
    pub fn spawn_yaml_watcher(&self, group: &Group) {
        let Some(yaml_path) = &group.yaml_path else {
            warn!(group = %group.id, "sync enabled without a YAML path");
            return;
        };
        match ManifestWatcher::spawn(
            group.id.clone(),
            yaml_path,
            self.guard.clone(),
            self.event_tx.clone(),
        ) {
            Ok(watcher) => {
                self.watchers.lock().insert(group.id.clone(), watcher);
            }
            Err(e) => warn!(group = %group.id, error = %e, "manifest watcher failed"),
        }
    }

    pub fn drop_yaml_watcher(&self, group_id: &GroupId) {
        self.watchers.lock().remove(group_id);
    }

    /// Mirror the group to its YAML file when sync is on. Failures are
    /// logged, not surfaced — config mutations must not fail on mirror
    /// I/O.
    pub fn sync_write(&self, group: &Group) {
        if !group.sync_enabled {
            return;
        }
        let Some(path) = &group.yaml_path else {
            return;
        };
        if let Err(e) = runner_manifest::write(group, path, &self.guard) {
            warn!(group = %group.id, error = %e, "manifest write failed");
        }
    }
}

/// Listener task accepting socket connections.
pub struct Listener {
    unix: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { unix, ctx }
    }

    /// Accept until the daemon shuts down, one task per connection.
    pub async fn run(self) {
        loop {
            tokio::select! {
                accepted = self.unix.accept() => match accepted {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "accept failed"),
                },
                _ = self.ctx.shutdown.cancelled() => {
                    info!("listener stopping");
                    return;
                }
            }
        }
    }
}

async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    ctx: &Arc<ListenCtx>,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let request: Request = match read_message(&mut reader).await {
            Ok(request) => request,
            Err(ProtocolError::Closed) => return Ok(()),
            Err(e) => return Err(e),
        };

        match request {
            Request::Subscribe => {
                write_message(&mut writer, &Response::Ok).await?;
                return stream_events(reader, writer, ctx).await;
            }
            request => {
                let response = dispatch(ctx, request).await;
                write_message(&mut writer, &response).await?;
            }
        }
    }
}

/// Push events to a subscribed connection until it goes away.
async fn stream_events<R, W>(
    mut reader: R,
    mut writer: W,
    ctx: &Arc<ListenCtx>,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut events = ctx.bus.subscribe();
    let mut drain = [0u8; 64];
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    write_message(&mut writer, &Response::Event { event }).await?;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged, events dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
            },
            read = tokio::io::AsyncReadExt::read(&mut reader, &mut drain) => match read {
                // Client hung up (or sent bytes we don't expect mid-stream)
                Ok(0) | Err(_) => return Ok(()),
                Ok(_) => debug!("ignoring bytes on subscribed connection"),
            },
            _ = ctx.shutdown.cancelled() => {
                let _ = write_message(&mut writer, &Response::ShuttingDown).await;
                return Ok(());
            }
        }
    }
}

/// Route one request to its subject handler.
pub async fn dispatch(ctx: &Arc<ListenCtx>, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::Hello { .. } => Response::Hello { version: PROTOCOL_VERSION.to_string() },
        Request::Shutdown => {
            info!("shutdown requested over the socket");
            ctx.shutdown.cancel();
            Response::ShuttingDown
        }
        Request::Subscribe => Response::error(
            ErrorKind::State,
            "subscribe is handled at the connection level",
        ),

        Request::GroupList
        | Request::GroupCreate { .. }
        | Request::GroupRename { .. }
        | Request::GroupSetDirectory { .. }
        | Request::GroupSetEnv { .. }
        | Request::GroupDelete { .. }
        | Request::GroupToggleSync { .. }
        | Request::GroupReload { .. }
        | Request::GroupExport { .. }
        | Request::GroupImport { .. } => groups::handle(ctx, request).await,

        Request::ProjectCreate { .. }
        | Request::ProjectUpdate { .. }
        | Request::ProjectDelete { .. }
        | Request::ProjectDeleteMany { .. }
        | Request::ProjectConvertMany { .. } => projects::handle(ctx, request).await,

        Request::ProcessStart { .. }
        | Request::ProcessStop { .. }
        | Request::ProcessRestart { .. }
        | Request::ProcessStatuses
        | Request::ProcessWriteStdin { .. }
        | Request::ProcessResizePty { .. } => processes::handle(ctx, request).await,

        Request::SessionList { .. }
        | Request::SessionListWithStats { .. }
        | Request::SessionGet { .. }
        | Request::SessionLogs { .. }
        | Request::SessionMetrics { .. }
        | Request::SessionLastCompleted { .. }
        | Request::SessionRecentLogs { .. }
        | Request::SessionLastMetric { .. }
        | Request::SessionDelete { .. }
        | Request::ProjectLogs { .. }
        | Request::ProjectClearLogs { .. } => sessions::handle(ctx, request).await,

        Request::SettingsGet
        | Request::SettingsUpdate { .. }
        | Request::DetectEditor
        | Request::DetectShell
        | Request::ResolveWorkingDir { .. }
        | Request::ResolveWorkingDirByProject { .. }
        | Request::StorageStats
        | Request::StorageCleanup { .. }
        | Request::StorageCleanupAll
        | Request::DatabasePath => settings::handle(ctx, request).await,
    }
}

fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::Closed => {}
        other => debug!(error = %other, "connection ended with error"),
    }
}

// ---------------------------------------------------------------------------
// Error mapping: typed errors out, never raw OS strings as kinds
// ---------------------------------------------------------------------------

pub(crate) fn storage_error(e: StorageError) -> Response {
    let kind = match &e {
        StorageError::NotFound(_) => ErrorKind::NotFound,
        StorageError::Conflict(_) => ErrorKind::Conflict,
        StorageError::Sqlite(_) | StorageError::Io(_) => ErrorKind::Storage,
    };
    Response::error(kind, e.to_string())
}

pub(crate) fn engine_error(e: EngineError) -> Response {
    let kind = match &e {
        EngineError::Spawn(_) => ErrorKind::Spawn,
        EngineError::Shell(PlatformError::Shell(_)) => ErrorKind::Shell,
        EngineError::Shell(_) => ErrorKind::Platform,
        EngineError::Storage(_) => ErrorKind::Storage,
        EngineError::State(_) => ErrorKind::State,
        EngineError::Watch(_) => ErrorKind::Platform,
    };
    Response::error(kind, e.to_string())
}

pub(crate) fn manifest_error(e: ManifestError) -> Response {
    let kind = match &e {
        ManifestError::Parse { .. } | ManifestError::Serialize(_) => ErrorKind::Parse,
        ManifestError::Io { .. } => ErrorKind::Storage,
        ManifestError::Watch(_) => ErrorKind::Platform,
    };
    Response::error(kind, e.to_string())
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;

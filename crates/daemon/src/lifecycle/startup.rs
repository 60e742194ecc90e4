// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: lock, recover, reap, wire, bind.

use std::io::Write;
use std::sync::Arc;

use fs2::FileExt;
use runner_engine::{StatsCollector, Supervisor};
use runner_manifest::WriteGuard;
use runner_platform::PidLedger;
use runner_storage::Database;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bus::EventBus;
use crate::listener::ListenCtx;

use super::{Config, LifecycleError};

const EVENT_CHANNEL_CAP: usize = 256;

/// Everything a running daemon holds.
pub struct DaemonState {
    pub config: Config,
    pub ctx: Arc<ListenCtx>,
    pub listener: UnixListener,
    // NOTE(lifetime): held to keep the exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: std::fs::File,
}

/// Start the daemon: acquire the lock, recover state, reap orphans, start
/// the engine, and bind the socket. Ordering matters — no spawn happens
/// before the orphan ledger has been drained.
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Lock first: prevents a second daemon racing the same state dir.
    // OpenOptions avoids truncating a live daemon's pid before the lock
    // is actually held.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // Storage + crash recovery
    let db = Database::open(&config.db_path)?;
    let crashed = db.mark_open_sessions_errored()?;
    if crashed > 0 {
        warn!(crashed, "closed sessions left running by a previous daemon");
    }

    // Orphan reaping happens before any new spawn is permitted
    let ledger = Arc::new(PidLedger::new(&config.ledger_path));
    let killed = ledger.reap_orphans()?;
    if !killed.is_empty() {
        info!(count = killed.len(), "reaped orphaned processes");
    }

    // Event plumbing: engine/watchers -> mpsc -> broadcast fanout
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAP);
    let (bus, _fanout) = EventBus::spawn(event_rx);

    let supervisor = Supervisor::new(db.clone(), Arc::clone(&ledger), event_tx.clone());
    let _stats = StatsCollector::spawn(&supervisor);

    let ctx = Arc::new(ListenCtx {
        db,
        supervisor,
        event_tx,
        bus,
        guard: WriteGuard::new(),
        watchers: parking_lot::Mutex::new(std::collections::HashMap::new()),
        shutdown: CancellationToken::new(),
    });

    // Manifest watchers for every sync-enabled group
    for group in ctx.db.list_groups()? {
        if group.sync_enabled {
            ctx.spawn_yaml_watcher(&group);
        }
    }

    // Bind last, once everything behind the socket is ready
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    autostart_projects(&ctx).await;

    Ok(DaemonState { config: config.clone(), ctx, listener, lock_file })
}

/// Start every project flagged `autoStartOnLaunch`. Failures are logged;
/// launch continues.
async fn autostart_projects(ctx: &ListenCtx) {
    let groups = match ctx.db.list_groups() {
        Ok(groups) => groups,
        Err(e) => {
            warn!(error = %e, "cannot list groups for autostart");
            return;
        }
    };
    for group in groups {
        for project in &group.projects {
            if !project.auto_start_on_launch {
                continue;
            }
            info!(project = %project.id, name = %project.name, "autostarting project");
            if let Err(e) = ctx.supervisor.start(&group, project, None, None).await {
                warn!(project = %project.id, error = %e, "autostart failed");
            }
        }
    }
}

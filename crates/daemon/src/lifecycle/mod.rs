// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: paths, startup, shutdown.

mod startup;

pub use startup::{startup, DaemonState};

use std::path::PathBuf;

use thiserror::Error;

use crate::env::state_dir;

/// Daemon configuration: every path the daemon touches, rooted in one
/// state directory.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. `~/.local/state/openrunner`)
    pub state_dir: PathBuf,
    /// Path to the Unix socket
    pub socket_path: PathBuf,
    /// Path to the lock/PID file
    pub lock_path: PathBuf,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Path to the orphan-pid ledger
    pub ledger_path: PathBuf,
    /// Path to the daemon log file
    pub log_path: PathBuf,
}

impl Config {
    /// Fixed paths under the user state dir; one daemon per user.
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::at(state_dir()?))
    }

    /// Root all paths at `dir` (tests use a scratch dir).
    pub fn at(dir: PathBuf) -> Self {
        Self {
            socket_path: dir.join("runnerd.sock"),
            lock_path: dir.join("runnerd.pid"),
            db_path: dir.join("runner-ui.db"),
            ledger_path: dir.join("runner.pids"),
            log_path: dir.join("runnerd.log"),
            state_dir: dir,
        }
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot determine a state directory (HOME unset)")]
    NoStateDir,

    #[error("another daemon holds the lock: {0}")]
    LockFailed(std::io::Error),

    #[error("failed to bind {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error(transparent)]
    Storage(#[from] runner_storage::StorageError),

    #[error(transparent)]
    Platform(#[from] runner_platform::PlatformError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

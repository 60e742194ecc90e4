// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orphan-pid ledger: one decimal root pid per line.
//!
//! Every spawned root pid is recorded before the child runs; pids are
//! removed when their process reaches a terminal state and the whole file
//! is truncated on clean shutdown. At startup any recorded pid that is
//! still alive belongs to a child that survived a crashed supervisor and
//! is force-killed before new spawns are allowed.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::PlatformError;
use crate::signal::{force_kill, is_process_running};

pub struct PidLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PidLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pids currently recorded. A missing file reads as empty.
    pub fn load(&self) -> Result<Vec<u32>, PlatformError> {
        let _guard = self.lock.lock();
        self.read_pids()
    }

    pub fn record(&self, pid: u32) -> Result<(), PlatformError> {
        let _guard = self.lock.lock();
        let mut pids = self.read_pids()?;
        if !pids.contains(&pid) {
            pids.push(pid);
            self.write_pids(&pids)?;
        }
        Ok(())
    }

    pub fn remove(&self, pid: u32) -> Result<(), PlatformError> {
        let _guard = self.lock.lock();
        let mut pids = self.read_pids()?;
        pids.retain(|p| *p != pid);
        self.write_pids(&pids)
    }

    /// Truncate the ledger (clean shutdown).
    pub fn clear(&self) -> Result<(), PlatformError> {
        let _guard = self.lock.lock();
        self.write_pids(&[])
    }

    /// Kill every recorded pid that is still alive, then truncate.
    /// Returns the pids that were actually killed.
    pub fn reap_orphans(&self) -> Result<Vec<u32>, PlatformError> {
        let _guard = self.lock.lock();
        let pids = self.read_pids()?;
        let mut killed = Vec::new();
        for pid in pids {
            if is_process_running(pid) {
                match force_kill(pid) {
                    Ok(()) => {
                        info!(pid, "killed orphaned process from previous run");
                        killed.push(pid);
                    }
                    Err(e) => warn!(pid, error = %e, "failed to kill orphan"),
                }
            }
        }
        self.write_pids(&[])?;
        Ok(killed)
    }

    fn read_pids(&self) -> Result<Vec<u32>, PlatformError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(text.lines().filter_map(|line| line.trim().parse().ok()).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_pids(&self, pids: &[u32]) -> Result<(), PlatformError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut text = String::new();
        for pid in pids {
            text.push_str(&pid.to_string());
            text.push('\n');
        }
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;

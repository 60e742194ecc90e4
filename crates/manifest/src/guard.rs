// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-write suppression: remembers when the application last wrote each
//! manifest path so watcher events inside the window can be discarded.
//! External edits (no recorded write) are never suppressed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Events within this window of a recorded write are treated as echoes of
/// our own write.
pub const SUPPRESS_WINDOW: Duration = Duration::from_millis(500);

#[derive(Clone, Default)]
pub struct WriteGuard {
    last_writes: Arc<Mutex<HashMap<PathBuf, Instant>>>,
}

impl WriteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deliberate write to `path`, starting the suppression window.
    pub fn record(&self, path: &Path) {
        self.last_writes.lock().insert(path.to_path_buf(), Instant::now());
    }

    /// Whether a change event on `path` should be discarded.
    pub fn suppressed(&self, path: &Path) -> bool {
        self.last_writes
            .lock()
            .get(path)
            .is_some_and(|written| written.elapsed() < SUPPRESS_WINDOW)
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-change restart watcher.
//!
//! One recursive watcher per auto-restart service. Events pass the ignore
//! filter (hard list + collected gitignores + user watch patterns), then a
//! 500 ms debounce; one restart fires per burst, carrying the path that
//! armed the timer last.

mod filter;

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event as FsEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use runner_core::ProjectId;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::supervisor::Control;

pub(crate) use filter::PathFilter;

pub(crate) const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Handle keeping the watcher and its debounce task alive. Dropping it
/// (actor exit, auto-restart flip, kind change) tears both down.
pub struct RestartWatcher {
    _watcher: RecommendedWatcher,
}

impl RestartWatcher {
    pub(crate) fn spawn(
        project_id: &ProjectId,
        watch_dir: &Path,
        group_dir: &Path,
        user_patterns: &[String],
        control_tx: mpsc::UnboundedSender<Control>,
    ) -> Result<Self, EngineError> {
        let filter = PathFilter::build(watch_dir, group_dir, user_patterns);
        let (fs_tx, fs_rx) = mpsc::channel::<PathBuf>(64);

        let project = project_id.clone();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<FsEvent>| {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    warn!(project = %project, error = %e, "restart watcher error");
                    return;
                }
            };
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }
            for path in &event.paths {
                let is_dir = path.is_dir();
                if filter.allows(path, is_dir) {
                    // Full channel: a restart is already inevitable
                    let _ = fs_tx.try_send(path.clone());
                }
            }
        })?;
        watcher.watch(watch_dir, RecursiveMode::Recursive)?;

        spawn_debouncer(project_id.clone(), fs_rx, control_tx);
        Ok(Self { _watcher: watcher })
    }
}

/// Collapse a burst of passing events into one restart per quiet window.
fn spawn_debouncer(
    project_id: ProjectId,
    mut fs_rx: mpsc::Receiver<PathBuf>,
    control_tx: mpsc::UnboundedSender<Control>,
) {
    tokio::spawn(async move {
        while let Some(first) = fs_rx.recv().await {
            let mut latest = first;
            loop {
                match tokio::time::timeout(DEBOUNCE_WINDOW, fs_rx.recv()).await {
                    Ok(Some(next)) => latest = next,
                    Ok(None) => return,
                    Err(_) => break,
                }
            }
            debug!(project = %project_id, path = %latest.display(), "debounced change burst");
            if control_tx.send(Control::WatcherFired(latest)).is_err() {
                return;
            }
        }
    });
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-group manifest watcher.
//!
//! Watches the group directory (non-recursive) filtered to the manifest
//! filename. Accepted changes are forwarded as [`Event::YamlFileChanged`];
//! events inside the self-write window are dropped before delivery.

use std::path::{Path, PathBuf};

use notify::{Event as FsEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use runner_core::{Event, GroupId};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ManifestError;
use crate::guard::WriteGuard;

/// Handle holding the underlying watcher. Dropping it stops delivery.
pub struct ManifestWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl ManifestWatcher {
    /// Watch `yaml_path` for changes made outside the application.
    pub fn spawn(
        group_id: GroupId,
        yaml_path: &Path,
        guard: WriteGuard,
        event_tx: mpsc::Sender<Event>,
    ) -> Result<Self, ManifestError> {
        let dir = yaml_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let watched = yaml_path.to_path_buf();
        let path = watched.clone();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<FsEvent>| {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "manifest watcher error");
                    return;
                }
            };
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }
            if !event.paths.iter().any(|p| p == &watched) {
                return;
            }
            if guard.suppressed(&watched) {
                debug!(path = %watched.display(), "suppressed self-write event");
                return;
            }
            let _ = event_tx.blocking_send(Event::YamlFileChanged {
                group_id: group_id.clone(),
                file_path: watched.clone(),
            });
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        Ok(Self { _watcher: watcher, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;

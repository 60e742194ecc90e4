// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor: owns every running handle and is the sole component
//! allowed to signal a child.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use runner_core::{Event, Group, LogChunk, ProcessInfo, Project, ProjectId};
use runner_platform::{force_kill, resolve_shell, PidLedger};
use runner_storage::Database;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::actor::ProjectActor;
use crate::child::{launch, StartSpec};
use crate::error::EngineError;
use crate::log_writer::spawn_log_writer;
use crate::watch::RestartWatcher;

/// Grace window between the soft and hard kill of a process tree.
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);
/// Backoff before an automatic respawn. Bounds restarts at 2/s.
pub const RESTART_DELAY: Duration = Duration::from_millis(500);

const LOG_CHANNEL_CAP: usize = 1024;
const SHUTDOWN_WAIT: Duration = Duration::from_secs(6);

/// State shared between the supervisor, its actors, the pumps, and the
/// stats collector.
pub(crate) struct EngineShared {
    pub db: Database,
    pub ledger: Arc<PidLedger>,
    pub event_tx: mpsc::Sender<Event>,
    pub log_tx: mpsc::Sender<LogChunk>,
    pub statuses: Mutex<HashMap<ProjectId, ProcessInfo>>,
    pub shutdown: CancellationToken,
}

impl EngineShared {
    /// Record the new snapshot and push the status event.
    pub async fn publish_status(&self, info: ProcessInfo) {
        self.statuses.lock().insert(info.project_id.clone(), info.clone());
        let _ = self.event_tx.send(Event::ProcessStatusChanged { info }).await;
    }
}

/// Control messages into a project's actor. Sends are queued: a stop
/// issued while the project is still starting executes right after the
/// running transition.
pub(crate) enum Control {
    Stop { reply: oneshot::Sender<()> },
    Restart,
    WriteStdin(String),
    Resize(u16, u16),
    WatcherFired(PathBuf),
    /// Config changed while running: respawns use the new project and the
    /// restart watcher is rebuilt (or torn down).
    UpdateSpec(Project),
}

pub(crate) struct ProjectHandle {
    pub(crate) control_tx: mpsc::UnboundedSender<Control>,
}

#[derive(Clone)]
pub struct Supervisor {
    shared: Arc<EngineShared>,
    projects: Arc<Mutex<HashMap<ProjectId, ProjectHandle>>>,
}

impl Supervisor {
    pub fn new(db: Database, ledger: Arc<PidLedger>, event_tx: mpsc::Sender<Event>) -> Self {
        let (log_tx, log_rx) = mpsc::channel(LOG_CHANNEL_CAP);
        let _writer = spawn_log_writer(db.clone(), log_rx);
        Self {
            shared: Arc::new(EngineShared {
                db,
                ledger,
                event_tx,
                log_tx,
                statuses: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
            }),
            projects: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub(crate) fn shared_arc(&self) -> Arc<EngineShared> {
        Arc::clone(&self.shared)
    }

    /// Start supervising `project`. Fails with `State` when the project is
    /// already under supervision and with `Spawn` when the child cannot be
    /// created (the session is finalized as errored in that case).
    pub async fn start(
        &self,
        group: &Group,
        project: &Project,
        cols: Option<u16>,
        rows: Option<u16>,
    ) -> Result<(), EngineError> {
        let configured_shell = self.shared.db.get_setting("default_shell").ok().flatten();
        let shell = resolve_shell(configured_shell.as_deref())?;
        let spec = StartSpec {
            project: project.clone(),
            group_dir: group.directory.clone(),
            env: compose_env(group, project),
            shell,
            cols,
            rows,
        };

        // Check-and-insert under one lock so concurrent starts cannot both
        // claim the project. The handle goes in before the spawn so
        // stop/stdin sent during Starting are queued for the actor rather
        // than dropped.
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        {
            let mut projects = self.projects.lock();
            if projects.get(&project.id).is_some_and(|h| !h.control_tx.is_closed()) {
                return Err(EngineError::State(format!(
                    "project {} is already running",
                    project.id
                )));
            }
            projects
                .insert(project.id.clone(), ProjectHandle { control_tx: control_tx.clone() });
        }

        let active = match launch(&self.shared, &spec).await {
            Ok(active) => active,
            Err(e) => {
                self.projects.lock().remove(&project.id);
                return Err(e);
            }
        };

        let watcher = if spec.project.restartable() {
            match RestartWatcher::spawn(
                &spec.project.id,
                &spec.working_dir(),
                &spec.group_dir,
                &spec.project.watch_patterns,
                control_tx.clone(),
            ) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    // Supervision continues without file-change restarts
                    warn!(project = %spec.project.id, error = %e, "restart watcher failed");
                    None
                }
            }
        } else {
            None
        };

        info!(project = %project.id, pid = active.pid, "process started");
        ProjectActor::spawn(
            Arc::clone(&self.shared),
            Arc::clone(&self.projects),
            spec,
            control_rx,
            control_tx,
            watcher,
            active,
        );
        Ok(())
    }

    /// Request a graceful stop and wait for the terminal transition.
    /// Stopping a project that is not running is a no-op.
    pub async fn stop(&self, project_id: &ProjectId) -> Result<(), EngineError> {
        let Some(reply_rx) = self.send_stop(project_id) else {
            return Ok(());
        };
        match tokio::time::timeout(SHUTDOWN_WAIT, reply_rx).await {
            Ok(_) => Ok(()),
            Err(_) => {
                warn!(project = %project_id, "stop did not settle within the shutdown window");
                Ok(())
            }
        }
    }

    /// Ask a running project's actor to cycle the child. Returns false when
    /// the project is not under supervision (caller starts it fresh).
    pub fn request_restart(&self, project_id: &ProjectId) -> bool {
        self.send_control(project_id, Control::Restart)
    }

    /// Hand a running actor the project's new configuration. Returns false
    /// when the project is not under supervision (nothing to update).
    pub fn update_project(&self, project: &Project) -> bool {
        self.send_control(&project.id, Control::UpdateSpec(project.clone()))
    }

    /// PTY stdin. Silently dropped when the project is not running or not
    /// interactive.
    pub fn write_stdin(&self, project_id: &ProjectId, data: String) {
        self.send_control(project_id, Control::WriteStdin(data));
    }

    /// PTY resize. No-op for pipe-mode or stopped projects.
    pub fn resize_pty(&self, project_id: &ProjectId, cols: u16, rows: u16) {
        self.send_control(project_id, Control::Resize(cols, rows));
    }

    pub fn is_running(&self, project_id: &ProjectId) -> bool {
        let mut projects = self.projects.lock();
        let alive = projects.get(project_id).map(|h| !h.control_tx.is_closed());
        match alive {
            Some(true) => true,
            Some(false) => {
                // Actor already exited; drop the stale handle
                projects.remove(project_id);
                false
            }
            None => false,
        }
    }

    /// Last known snapshot for every project seen this run.
    pub fn statuses(&self) -> Vec<ProcessInfo> {
        self.shared.statuses.lock().values().cloned().collect()
    }

    pub fn status_of(&self, project_id: &ProjectId) -> Option<ProcessInfo> {
        self.shared.statuses.lock().get(project_id).cloned()
    }

    /// Stop everything in parallel, force-kill whatever is left after the
    /// grace window, and truncate the orphan ledger.
    pub async fn shutdown_all(&self) {
        self.shared.shutdown.cancel();

        let replies: Vec<_> = {
            let projects = self.projects.lock();
            projects.keys().cloned().collect()
        };
        let mut waits = Vec::new();
        for project_id in replies {
            if let Some(reply_rx) = self.send_stop(&project_id) {
                waits.push(reply_rx);
            }
        }
        let drain = async {
            for wait in waits {
                let _ = wait.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_WAIT, drain).await.is_err() {
            // Hard-kill any tree whose actor has not settled
            let leftover: Vec<(ProjectId, u32)> = self
                .shared
                .statuses
                .lock()
                .values()
                .filter(|info| !info.status.is_terminal())
                .filter_map(|info| Some((info.project_id.clone(), info.pid?)))
                .collect();
            for (project_id, pid) in leftover {
                warn!(project = %project_id, pid, "force-killing unsettled process at shutdown");
                if let Err(e) = force_kill(pid) {
                    warn!(pid, error = %e, "force kill failed");
                }
            }
        }

        if let Err(e) = self.shared.ledger.clear() {
            warn!(error = %e, "failed to clear orphan ledger");
        }
    }

    fn send_stop(&self, project_id: &ProjectId) -> Option<oneshot::Receiver<()>> {
        let projects = self.projects.lock();
        let handle = projects.get(project_id)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        if handle.control_tx.send(Control::Stop { reply: reply_tx }).is_err() {
            return None;
        }
        Some(reply_rx)
    }

    fn send_control(&self, project_id: &ProjectId, control: Control) -> bool {
        let projects = self.projects.lock();
        match projects.get(project_id) {
            Some(handle) => handle.control_tx.send(control).is_ok(),
            None => false,
        }
    }
}

/// Group env ∪ project env, later wins, plus ANSI color hints unless the
/// user already set them.
fn compose_env(group: &Group, project: &Project) -> HashMap<String, String> {
    let mut env = group.env_vars.clone();
    env.extend(project.env_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
    for (key, value) in [("FORCE_COLOR", "1"), ("CLICOLOR_FORCE", "1")] {
        env.entry(key.to_string()).or_insert_with(|| value.to_string());
    }
    env
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-project actor: one task owns one child's lifetime.
//!
//! The actor serializes every transition for its project. It selects on
//! child exit, queued control messages, and the engine-wide shutdown
//! token; on auto-restart it re-launches from the same start spec after
//! the backoff.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use runner_core::{ExitStatus, ProcessInfo, ProcessStatus, ProjectId, SessionId};
use runner_platform::{force_kill, graceful_shutdown};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::child::{launch, Active, StartSpec};
use crate::supervisor::{Control, EngineShared, ProjectHandle, GRACE_PERIOD, RESTART_DELAY};
use crate::watch::RestartWatcher;

enum After {
    Exit,
    Restart,
}

pub(crate) struct ProjectActor {
    shared: Arc<EngineShared>,
    projects: Arc<Mutex<HashMap<ProjectId, ProjectHandle>>>,
    spec: StartSpec,
    control_rx: mpsc::UnboundedReceiver<Control>,
    /// Kept for rebuilding the watcher after a config update.
    control_tx: mpsc::UnboundedSender<Control>,
    /// Alive for the actor's whole life so watch-triggered restarts span
    /// respawns. None for tasks and non-auto-restart services.
    watcher: Option<RestartWatcher>,
}

impl ProjectActor {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        shared: Arc<EngineShared>,
        projects: Arc<Mutex<HashMap<ProjectId, ProjectHandle>>>,
        spec: StartSpec,
        control_rx: mpsc::UnboundedReceiver<Control>,
        control_tx: mpsc::UnboundedSender<Control>,
        watcher: Option<RestartWatcher>,
        active: Active,
    ) {
        let actor = Self { shared, projects, spec, control_rx, control_tx, watcher };
        tokio::spawn(actor.run(active));
    }

    /// Swap in the updated project record: respawns use it, and the
    /// restart watcher follows the new kind/flag/patterns.
    fn apply_update(&mut self, project: runner_core::Project) {
        let patterns_changed = project.watch_patterns != self.spec.project.watch_patterns;
        let restartable_changed = project.restartable() != self.spec.project.restartable();
        self.spec.project = project;

        if restartable_changed || patterns_changed {
            self.watcher = None;
            if self.spec.project.restartable() {
                match RestartWatcher::spawn(
                    &self.spec.project.id,
                    &self.spec.working_dir(),
                    &self.spec.group_dir,
                    &self.spec.project.watch_patterns,
                    self.control_tx.clone(),
                ) {
                    Ok(watcher) => self.watcher = Some(watcher),
                    Err(e) => warn!(
                        project = %self.spec.project.id,
                        error = %e,
                        "watcher rebuild failed"
                    ),
                }
            }
        }
    }

    async fn run(mut self, mut active: Active) {
        loop {
            match self.supervise(&mut active).await {
                After::Exit => break,
                After::Restart => {
                    if !self.backoff().await {
                        break;
                    }
                    match launch(&self.shared, &self.spec).await {
                        Ok(next) => active = next,
                        Err(e) => {
                            warn!(project = %self.spec.project.id, error = %e, "respawn failed");
                            break;
                        }
                    }
                }
            }
        }
        self.deregister();
    }

    /// Drop this actor's handle from the supervisor map. Guarded by
    /// channel identity so a replacement actor's handle is never removed.
    fn deregister(&self) {
        let mut projects = self.projects.lock();
        let ours = projects
            .get(&self.spec.project.id)
            .is_some_and(|h| h.control_tx.same_channel(&self.control_tx));
        if ours {
            projects.remove(&self.spec.project.id);
        }
    }

    /// Drive one child to its end. Returns whether to respawn.
    async fn supervise(&mut self, active: &mut Active) -> After {
        loop {
            tokio::select! {
                code = active.child.wait() => {
                    let status = if code == Some(0) {
                        ExitStatus::Stopped
                    } else {
                        ExitStatus::Errored
                    };
                    info!(
                        project = %self.spec.project.id,
                        pid = active.pid,
                        code = code.unwrap_or(-1),
                        "process exited"
                    );
                    self.finalize(active.pid, &active.session.id, status).await;
                    if status == ExitStatus::Errored && self.spec.project.restartable() {
                        return After::Restart;
                    }
                    return After::Exit;
                }
                msg = self.control_rx.recv() => match msg {
                    Some(Control::Stop { reply }) => {
                        self.stop_child(active).await;
                        self.finalize(active.pid, &active.session.id, ExitStatus::Stopped).await;
                        // Deregister before replying so a stop that has
                        // resolved observes the project as not running
                        self.deregister();
                        let _ = reply.send(());
                        return After::Exit;
                    }
                    Some(Control::Restart) => {
                        self.stop_child(active).await;
                        self.finalize(active.pid, &active.session.id, ExitStatus::Stopped).await;
                        return After::Restart;
                    }
                    Some(Control::WatcherFired(path)) => {
                        info!(
                            project = %self.spec.project.id,
                            path = %path.display(),
                            "file change triggered restart"
                        );
                        self.stop_child(active).await;
                        self.finalize(active.pid, &active.session.id, ExitStatus::Stopped).await;
                        return After::Restart;
                    }
                    Some(Control::WriteStdin(data)) => active.child.write_stdin(data),
                    Some(Control::Resize(cols, rows)) => active.child.resize(cols, rows),
                    Some(Control::UpdateSpec(project)) => self.apply_update(project),
                    // Supervisor dropped: treat like shutdown
                    None => {
                        self.stop_child(active).await;
                        self.finalize(active.pid, &active.session.id, ExitStatus::Stopped).await;
                        return After::Exit;
                    }
                },
                _ = self.shared.shutdown.cancelled() => {
                    self.stop_child(active).await;
                    self.finalize(active.pid, &active.session.id, ExitStatus::Stopped).await;
                    return After::Exit;
                }
            }
        }
    }

    /// Graceful signal, 5 s window, then force-kill. Signal failures are
    /// logged; the sequence always proceeds to the hard kill.
    async fn stop_child(&self, active: &mut Active) {
        self.shared
            .publish_status(ProcessInfo {
                project_id: self.spec.project.id.clone(),
                group_id: self.spec.project.group_id.clone(),
                status: ProcessStatus::Stopping,
                pid: Some(active.pid),
                session_id: Some(active.session.id.clone()),
                cpu: None,
                memory: None,
            })
            .await;

        if let Err(e) = graceful_shutdown(active.pid) {
            warn!(pid = active.pid, error = %e, "graceful signal failed");
        }
        if tokio::time::timeout(GRACE_PERIOD, active.child.wait()).await.is_err() {
            warn!(pid = active.pid, "grace period elapsed, force-killing tree");
            if let Err(e) = force_kill(active.pid) {
                warn!(pid = active.pid, error = %e, "force kill failed");
            }
            let _ = active.child.wait().await;
        }
    }

    /// Close the session, release the pid, and publish the terminal state.
    async fn finalize(&self, pid: u32, session_id: &SessionId, status: ExitStatus) {
        if let Err(e) = self.shared.db.end_session(session_id, status) {
            warn!(session = %session_id, error = %e, "failed to end session");
        }
        if let Err(e) = self.shared.ledger.remove(pid) {
            warn!(pid = pid, error = %e, "failed to drop pid from ledger");
        }
        let terminal = match status {
            ExitStatus::Errored => ProcessStatus::Errored,
            _ => ProcessStatus::Stopped,
        };
        self.shared
            .publish_status(ProcessInfo::terminal(
                self.spec.project.id.clone(),
                self.spec.project.group_id.clone(),
                terminal,
            ))
            .await;
    }

    /// Sleep out the restart backoff. Returns false when a stop or the
    /// engine shutdown arrived instead, cancelling the respawn.
    async fn backoff(&mut self) -> bool {
        let deadline = tokio::time::Instant::now() + RESTART_DELAY;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return true,
                _ = self.shared.shutdown.cancelled() => return false,
                msg = self.control_rx.recv() => match msg {
                    Some(Control::Stop { reply }) => {
                        self.deregister();
                        let _ = reply.send(());
                        return false;
                    }
                    Some(Control::UpdateSpec(project)) => self.apply_update(project),
                    // Restart/watcher fires collapse into the pending
                    // respawn; stdin and resize have no target while the
                    // child is down.
                    Some(_) => {}
                    None => return false,
                },
            }
        }
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child spawning: pipe and PTY variants behind one handle.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use runner_core::{ProcessInfo, ProcessStatus, Project, Session};
use runner_platform::{build_command, Shell};
use tracing::warn;

use crate::error::EngineError;
use crate::pty::PtyChild;
use crate::pumps;
use crate::supervisor::EngineShared;

/// Everything needed to (re)spawn one project's child. Snapshotted at
/// `start()` so auto-restarts reuse the same resolved configuration.
#[derive(Clone)]
pub(crate) struct StartSpec {
    pub project: Project,
    pub group_dir: PathBuf,
    /// Composed env additions: group ∪ project, later wins, plus color
    /// defaults. The child inherits the daemon environment underneath.
    pub env: HashMap<String, String>,
    pub shell: Shell,
    pub cols: Option<u16>,
    pub rows: Option<u16>,
}

impl StartSpec {
    pub fn working_dir(&self) -> PathBuf {
        self.project.working_dir(&self.group_dir)
    }
}

/// A live child plus the session it is attached to.
pub(crate) struct Active {
    pub child: RunningChild,
    pub pid: u32,
    pub session: Session,
}

pub(crate) enum RunningChild {
    Pipes(tokio::process::Child),
    Pty(PtyChild),
}

impl RunningChild {
    /// Wait for the child to exit; returns the exit code when the OS
    /// reports one. Cancel-safe, so it can live in a `select!` arm.
    pub async fn wait(&mut self) -> Option<i32> {
        match self {
            RunningChild::Pipes(child) => match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!(error = %e, "wait on child failed");
                    None
                }
            },
            RunningChild::Pty(pty) => pty.wait().await,
        }
    }

    /// PTY stdin bytes. Pipe-mode children have no writer side; the write
    /// is dropped silently per the state policy.
    pub fn write_stdin(&mut self, data: String) {
        if let RunningChild::Pty(pty) = self {
            pty.write(data);
        }
    }

    /// PTY resize; no-op for pipe mode.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if let RunningChild::Pty(pty) = self {
            pty.resize(cols, rows);
        }
    }
}

/// Spawn the child described by `spec`, open its session, and wire its
/// output pumps. On failure the just-created session is finalized as
/// errored before the error propagates.
pub(crate) async fn launch(
    shared: &EngineShared,
    spec: &StartSpec,
) -> Result<Active, EngineError> {
    let session = shared.db.create_session(&spec.project.id)?;
    shared
        .publish_status(ProcessInfo {
            project_id: spec.project.id.clone(),
            group_id: spec.project.group_id.clone(),
            status: ProcessStatus::Starting,
            pid: None,
            session_id: Some(session.id.clone()),
            cpu: None,
            memory: None,
        })
        .await;

    match spawn_child(shared, spec, &session).await {
        Ok(active) => {
            shared
                .publish_status(ProcessInfo {
                    project_id: spec.project.id.clone(),
                    group_id: spec.project.group_id.clone(),
                    status: ProcessStatus::Running,
                    pid: Some(active.pid),
                    session_id: Some(session.id.clone()),
                    cpu: None,
                    memory: None,
                })
                .await;
            Ok(active)
        }
        Err(e) => {
            if let Err(db_err) =
                shared.db.end_session(&session.id, runner_core::ExitStatus::Errored)
            {
                warn!(error = %db_err, "failed to finalize session after spawn error");
            }
            shared
                .publish_status(ProcessInfo::terminal(
                    spec.project.id.clone(),
                    spec.project.group_id.clone(),
                    ProcessStatus::Errored,
                ))
                .await;
            Err(e)
        }
    }
}

async fn spawn_child(
    shared: &EngineShared,
    spec: &StartSpec,
    session: &Session,
) -> Result<Active, EngineError> {
    let cwd = spec.working_dir();
    if !cwd.is_dir() {
        return Err(EngineError::Spawn(format!(
            "working directory does not exist: {}",
            cwd.display()
        )));
    }

    if spec.project.interactive {
        let pty = PtyChild::spawn(shared, spec, session, &cwd)?;
        let pid = pty.pid();
        record_pid(shared, pid);
        return Ok(Active { child: RunningChild::Pty(pty), pid, session: session.clone() });
    }

    let mut cmd = build_command(&spec.shell, &spec.project.command, &cwd, &spec.env);
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| EngineError::Spawn(e.to_string()))?;
    let pid = child
        .id()
        .ok_or_else(|| EngineError::Spawn("child exited before pid was read".into()))?;
    record_pid(shared, pid);

    pumps::spawn_pipe_pumps(shared, &spec.project.id, &session.id, &mut child);
    Ok(Active { child: RunningChild::Pipes(child), pid, session: session.clone() })
}

fn record_pid(shared: &EngineShared, pid: u32) {
    if let Err(e) = shared.ledger.record(pid) {
        warn!(pid, error = %e, "failed to record pid in orphan ledger");
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live process state as reported to the UI.

use serde::{Deserialize, Serialize};

use crate::id::{GroupId, ProjectId, SessionId};

/// Supervisor state machine position for one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
    Errored,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Starting => "starting",
            ProcessStatus::Running => "running",
            ProcessStatus::Stopping => "stopping",
            ProcessStatus::Errored => "errored",
        }
    }

    /// Terminal states release the project's running handle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessStatus::Stopped | ProcessStatus::Errored)
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one project's process, pushed on status changes and stats
/// ticks. Stats fields are null when the process is not running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub project_id: ProjectId,
    pub group_id: GroupId,
    pub status: ProcessStatus,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    /// Aggregate CPU percent over the whole process tree.
    #[serde(default)]
    pub cpu: Option<f32>,
    /// Aggregate resident memory in bytes over the whole process tree.
    #[serde(default)]
    pub memory: Option<u64>,
}

impl ProcessInfo {
    /// A stopped/errored snapshot with stats nulled out.
    pub fn terminal(project_id: ProjectId, group_id: GroupId, status: ProcessStatus) -> Self {
        Self {
            project_id,
            group_id,
            status,
            pid: None,
            session_id: None,
            cpu: None,
            memory: None,
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;

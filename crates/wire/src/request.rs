// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests from the UI to the daemon.

use std::collections::HashMap;
use std::path::PathBuf;

use runner_core::{GroupId, ProjectId, ProjectKind, SessionId};
use serde::{Deserialize, Serialize};

use crate::types::Settings;

/// Project fields as supplied by the UI on create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub name: String,
    pub command: String,
    #[serde(default = "default_kind")]
    pub kind: ProjectKind,
    #[serde(default = "default_true")]
    pub auto_restart: bool,
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub interactive: bool,
    #[serde(default)]
    pub watch_patterns: Vec<String>,
    #[serde(default)]
    pub auto_start_on_launch: bool,
}

fn default_kind() -> ProjectKind {
    ProjectKind::Service
}

fn default_true() -> bool {
    true
}

/// Request from the UI to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    #[serde(rename = "ping")]
    Ping,

    /// Version handshake
    #[serde(rename = "hello")]
    Hello { version: String },

    /// Turn this connection into a push-event stream
    #[serde(rename = "subscribe")]
    Subscribe,

    /// Request daemon shutdown
    #[serde(rename = "shutdown")]
    Shutdown,

    // -- groups --
    #[serde(rename = "group:list")]
    GroupList,

    #[serde(rename = "group:create")]
    GroupCreate {
        name: String,
        directory: PathBuf,
        #[serde(default)]
        sync_enabled: bool,
    },

    #[serde(rename = "group:rename")]
    GroupRename { group_id: GroupId, name: String },

    #[serde(rename = "group:set-directory")]
    GroupSetDirectory { group_id: GroupId, directory: PathBuf },

    #[serde(rename = "group:set-env")]
    GroupSetEnv { group_id: GroupId, env_vars: HashMap<String, String> },

    #[serde(rename = "group:delete")]
    GroupDelete { group_id: GroupId },

    #[serde(rename = "group:toggle-sync")]
    GroupToggleSync { group_id: GroupId, enabled: bool },

    /// Re-read the group's YAML file into the config store
    #[serde(rename = "group:reload")]
    GroupReload { group_id: GroupId },

    #[serde(rename = "group:export")]
    GroupExport { group_id: GroupId, file_path: PathBuf },

    #[serde(rename = "group:import")]
    GroupImport { file_path: PathBuf },

    // -- projects --
    #[serde(rename = "project:create")]
    ProjectCreate { group_id: GroupId, spec: ProjectSpec },

    #[serde(rename = "project:update")]
    ProjectUpdate { project_id: ProjectId, spec: ProjectSpec },

    #[serde(rename = "project:delete")]
    ProjectDelete { project_id: ProjectId },

    #[serde(rename = "project:delete-many")]
    ProjectDeleteMany { project_ids: Vec<ProjectId> },

    #[serde(rename = "project:convert-many")]
    ProjectConvertMany { project_ids: Vec<ProjectId>, kind: ProjectKind },

    // -- processes --
    #[serde(rename = "process:start")]
    ProcessStart {
        group_id: GroupId,
        project_id: ProjectId,
        /// Initial PTY size for interactive projects
        #[serde(default)]
        cols: Option<u16>,
        #[serde(default)]
        rows: Option<u16>,
    },

    #[serde(rename = "process:stop")]
    ProcessStop { project_id: ProjectId },

    #[serde(rename = "process:restart")]
    ProcessRestart { project_id: ProjectId },

    #[serde(rename = "process:statuses")]
    ProcessStatuses,

    #[serde(rename = "process:stdin")]
    ProcessWriteStdin { project_id: ProjectId, data: String },

    #[serde(rename = "process:resize")]
    ProcessResizePty { project_id: ProjectId, cols: u16, rows: u16 },

    // -- sessions / logs / metrics --
    #[serde(rename = "session:list")]
    SessionList { project_id: ProjectId },

    #[serde(rename = "session:list-with-stats")]
    SessionListWithStats { project_id: ProjectId },

    #[serde(rename = "session:get")]
    SessionGet { session_id: SessionId },

    /// Concatenated log text of one session
    #[serde(rename = "session:logs")]
    SessionLogs { session_id: SessionId },

    #[serde(rename = "session:metrics")]
    SessionMetrics { session_id: SessionId },

    #[serde(rename = "session:last-completed")]
    SessionLastCompleted { project_id: ProjectId },

    /// Last N log rows of the most recent session, chronological
    #[serde(rename = "session:recent-logs")]
    SessionRecentLogs { project_id: ProjectId, limit: u32 },

    #[serde(rename = "session:last-metric")]
    SessionLastMetric { session_id: SessionId },

    #[serde(rename = "session:delete")]
    SessionDelete { session_id: SessionId },

    /// Concatenated log text of the project's most recent session
    #[serde(rename = "project:logs")]
    ProjectLogs { project_id: ProjectId },

    #[serde(rename = "project:clear-logs")]
    ProjectClearLogs { project_id: ProjectId },

    // -- settings & misc --
    #[serde(rename = "settings:get")]
    SettingsGet,

    #[serde(rename = "settings:update")]
    SettingsUpdate { settings: Settings },

    #[serde(rename = "detect:editor")]
    DetectEditor,

    #[serde(rename = "detect:shell")]
    DetectShell,

    #[serde(rename = "resolve:working-dir")]
    ResolveWorkingDir { group_id: GroupId, project_id: ProjectId },

    #[serde(rename = "resolve:working-dir-by-project")]
    ResolveWorkingDirByProject { project_id: ProjectId },

    #[serde(rename = "storage:stats")]
    StorageStats,

    /// Remove sessions that ended more than `days` ago
    #[serde(rename = "storage:cleanup")]
    StorageCleanup { days: u32 },

    /// Remove all completed sessions
    #[serde(rename = "storage:cleanup-all")]
    StorageCleanupAll,

    #[serde(rename = "storage:database-path")]
    DatabasePath,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

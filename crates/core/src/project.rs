// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project records: one supervised shell command.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::id::{GroupId, ProjectId};

/// Closed project kind: long-running service or one-shot task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    Service,
    Task,
}

impl ProjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKind::Service => "service",
            ProjectKind::Task => "task",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "service" => Some(ProjectKind::Service),
            "task" => Some(ProjectKind::Task),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One shell command under supervision, owned by exactly one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub group_id: GroupId,
    pub name: String,
    /// Single command line, executed via the user's shell.
    pub command: String,
    pub kind: ProjectKind,
    /// Only meaningful for services; tasks never auto-restart.
    pub auto_restart: bool,
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
    /// Working-directory override. Relative paths resolve against the group
    /// directory, absolute paths are used as-is.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// PTY mode instead of stdout/stderr pipes.
    #[serde(default)]
    pub interactive: bool,
    #[serde(default)]
    pub watch_patterns: Vec<String>,
    #[serde(default)]
    pub auto_start_on_launch: bool,
}

impl Project {
    /// Effective working directory given the owning group's directory.
    pub fn working_dir(&self, group_dir: &Path) -> PathBuf {
        match &self.cwd {
            Some(cwd) if cwd.is_absolute() => cwd.clone(),
            Some(cwd) => group_dir.join(cwd),
            None => group_dir.to_path_buf(),
        }
    }

    /// Whether crash/file-change auto-restart applies to this project.
    pub fn restartable(&self) -> bool {
        self.kind == ProjectKind::Service && self.auto_restart
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;

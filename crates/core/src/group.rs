// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Group records: a named collection of projects sharing a directory and
//! an env-var base.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::id::{GroupId, ProjectId};
use crate::project::Project;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// Absolute working directory; project cwd overrides resolve against it.
    pub directory: PathBuf,
    /// Insertion-ordered.
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
    /// Path of the mirrored YAML file. Must be set while `sync_enabled`.
    #[serde(default)]
    pub yaml_path: Option<PathBuf>,
    #[serde(default)]
    pub sync_enabled: bool,
}

impl Group {
    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| &p.id == id)
    }

    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Env vars a child inherits before project-level overrides apply.
    pub fn base_env(&self) -> &HashMap<String, String> {
        &self.env_vars
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;

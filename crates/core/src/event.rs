// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push events from the core to the UI.
//!
//! Serializes with `{"type": "subject:verb", ...fields}` format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::group::Group;
use crate::id::{GroupId, ProjectId};
use crate::process::ProcessInfo;
use crate::session::LogStream;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A project's process changed supervisor state.
    #[serde(rename = "process:status")]
    ProcessStatusChanged { info: ProcessInfo },

    /// Output bytes left a child. Partial lines are forwarded verbatim.
    #[serde(rename = "process:log")]
    ProcessLog {
        project_id: ProjectId,
        stream: LogStream,
        data: String,
        timestamp: DateTime<Utc>,
    },

    /// Periodic stats snapshot for every running project.
    #[serde(rename = "process:stats")]
    ProcessStatsUpdated { stats: Vec<ProcessInfo> },

    /// A synced group's YAML file changed outside the application.
    #[serde(rename = "yaml:changed")]
    YamlFileChanged { group_id: GroupId, file_path: PathBuf },

    /// Groups were reloaded (YAML import or sync reload).
    #[serde(rename = "config:reloaded")]
    ConfigReloaded { groups: Vec<Group> },
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

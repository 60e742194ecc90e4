// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy carried in `Response::Error`.

use serde::{Deserialize, Serialize};

/// Typed error kinds the daemon returns to commands. OS error strings are
/// folded into `message`, never into the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing group, project, or session.
    NotFound,
    /// Operation conflicts with current configuration (e.g. sync toggle
    /// without a YAML path).
    Conflict,
    /// Database or file I/O failure.
    Storage,
    /// Child process could not be created.
    Spawn,
    /// No usable shell found.
    Shell,
    /// Signal or process-control call failed.
    Platform,
    /// Invalid YAML.
    Parse,
    /// Operation invalid for the current process state.
    State,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Storage => "storage",
            ErrorKind::Spawn => "spawn",
            ErrorKind::Shell => "shell",
            ErrorKind::Platform => "platform",
            ErrorKind::Parse => "parse",
            ErrorKind::State => "state",
        };
        f.write_str(s)
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Responses from the daemon to the UI.

use std::path::PathBuf;

use runner_core::{Event, Group, LogChunk, MetricPoint, ProcessInfo, Project, Session};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::types::{SessionStats, Settings, StorageStats};

/// Response from daemon to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    #[serde(rename = "ok")]
    Ok,

    /// Health check response
    #[serde(rename = "pong")]
    Pong,

    /// Version handshake response
    #[serde(rename = "hello")]
    Hello { version: String },

    /// Daemon is shutting down
    #[serde(rename = "shutting-down")]
    ShuttingDown,

    /// Pushed event on a subscribed connection
    #[serde(rename = "event")]
    Event { event: Event },

    #[serde(rename = "groups")]
    Groups { groups: Vec<Group> },

    #[serde(rename = "group")]
    Group { group: Box<Group> },

    #[serde(rename = "project")]
    Project { project: Box<Project> },

    #[serde(rename = "statuses")]
    Statuses { statuses: Vec<ProcessInfo> },

    #[serde(rename = "sessions")]
    Sessions { sessions: Vec<Session> },

    #[serde(rename = "sessions-with-stats")]
    SessionsWithStats { sessions: Vec<SessionStats> },

    #[serde(rename = "session")]
    Session { session: Option<Box<Session>> },

    #[serde(rename = "logs")]
    Logs { logs: Vec<LogChunk> },

    /// Concatenated log text in timestamp order
    #[serde(rename = "log-text")]
    LogText { text: String },

    #[serde(rename = "metrics")]
    Metrics { metrics: Vec<MetricPoint> },

    #[serde(rename = "metric")]
    Metric { metric: Option<MetricPoint> },

    #[serde(rename = "settings")]
    Settings { settings: Settings },

    #[serde(rename = "working-dir")]
    WorkingDir { path: PathBuf },

    #[serde(rename = "storage-stats")]
    StorageStats { stats: StorageStats },

    /// Database or exported file path
    #[serde(rename = "path")]
    Path { path: PathBuf },

    #[serde(rename = "shell")]
    Shell { shell: String },

    #[serde(rename = "editor")]
    Editor { editor: Option<String> },

    /// Sessions removed by a cleanup command
    #[serde(rename = "cleaned")]
    Cleaned { sessions_removed: usize },

    /// Typed error
    #[serde(rename = "error")]
    Error { kind: ErrorKind, message: String },
}

impl Response {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Error { kind, message: message.into() }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;

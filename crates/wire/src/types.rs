// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTO structs for the IPC protocol.

use runner_core::Session;
use serde::{Deserialize, Serialize};

/// Session row joined with per-session log/metric aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    #[serde(flatten)]
    pub session: Session,
    pub log_count: u64,
    /// Total stored log bytes for the session.
    pub log_size: u64,
    pub metric_count: u64,
}

/// Application settings key/value surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_shell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_retention_days: Option<u32>,
}

/// Aggregate storage counters for the settings screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    pub session_count: u64,
    pub log_count: u64,
    pub log_bytes: u64,
    pub metric_count: u64,
    pub database_size_bytes: u64,
}

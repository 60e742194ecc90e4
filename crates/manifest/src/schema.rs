// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk YAML schema for `openrunner.yaml`.

use std::collections::HashMap;

use runner_core::ProjectKind;
use serde::{Deserialize, Serialize};

pub const MANIFEST_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_version")]
    pub version: String,
    pub name: String,
    #[serde(rename = "envVars", default, skip_serializing_if = "HashMap::is_empty")]
    pub env_vars: HashMap<String, String>,
    #[serde(default)]
    pub projects: Vec<ManifestProject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestProject {
    pub name: String,
    pub command: String,
    /// Written explicitly; defaults to service on read.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: ProjectKind,
    #[serde(rename = "autoRestart", default = "default_true")]
    pub auto_restart: bool,
    /// Relative to the group directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default)]
    pub interactive: bool,
    #[serde(rename = "envVars", default, skip_serializing_if = "HashMap::is_empty")]
    pub env_vars: HashMap<String, String>,
    #[serde(rename = "watchPatterns", default, skip_serializing_if = "Vec::is_empty")]
    pub watch_patterns: Vec<String>,
    #[serde(rename = "autoStartOnLaunch", default, skip_serializing_if = "is_false")]
    pub auto_start_on_launch: bool,
}

fn default_version() -> String {
    MANIFEST_VERSION.to_string()
}

fn default_kind() -> ProjectKind {
    ProjectKind::Service
}

fn default_true() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(v: &bool) -> bool {
    !*v
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

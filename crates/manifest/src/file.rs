// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manifest file discovery, parsing, and guarded writes.

use std::path::{Path, PathBuf};

use runner_core::Group;
use tracing::debug;

use crate::convert::from_group;
use crate::error::ManifestError;
use crate::guard::WriteGuard;
use crate::schema::Manifest;

pub const FILE_NAME: &str = "openrunner.yaml";
/// Accepted on read only; writes always use [`FILE_NAME`].
pub const FILE_NAME_ALT: &str = "openrunner.yml";

/// Locate a manifest in `dir`, preferring the canonical name.
pub fn find_manifest(dir: &Path) -> Option<PathBuf> {
    for name in [FILE_NAME, FILE_NAME_ALT] {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

pub fn parse(path: &Path) -> Result<Manifest, ManifestError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ManifestError::Io { path: path.to_path_buf(), source })?;
    serde_yaml::from_str(&text)
        .map_err(|source| ManifestError::Parse { path: path.to_path_buf(), source })
}

/// Serialize the group to `path` and record the write in `guard` so the
/// resulting filesystem event is suppressed.
pub fn write(group: &Group, path: &Path, guard: &WriteGuard) -> Result<(), ManifestError> {
    let manifest = from_group(group);
    let text = serde_yaml::to_string(&manifest)?;
    guard.record(path);
    std::fs::write(path, text)
        .map_err(|source| ManifestError::Io { path: path.to_path_buf(), source })?;
    debug!(path = %path.display(), group = %group.id, "wrote manifest");
    Ok(())
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;

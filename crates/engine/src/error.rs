// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn process: {0}")]
    Spawn(String),

    #[error(transparent)]
    Shell(#[from] runner_platform::PlatformError),

    #[error(transparent)]
    Storage(#[from] runner_storage::StorageError),

    #[error("invalid state: {0}")]
    State(String),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

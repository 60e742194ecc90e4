// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("no usable shell found: {0}")]
    Shell(String),

    #[error("signal delivery to pid {pid} failed: {message}")]
    Signal { pid: u32, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

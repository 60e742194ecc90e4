// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! runner-manifest: the two-way bridge between sync-enabled groups and
//! their `openrunner.yaml` files.
//!
//! Reads apply schema defaults; writes omit empty optionals for stable
//! diffs. The daemon's own writes are recorded in a [`WriteGuard`] so the
//! directory watcher can discard the change events they cause.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod convert;
mod error;
mod file;
mod guard;
mod schema;
mod watcher;

pub use convert::{apply_to_group, from_group, to_group};
pub use error::ManifestError;
pub use file::{find_manifest, parse, write, FILE_NAME, FILE_NAME_ALT};
pub use guard::{WriteGuard, SUPPRESS_WINDOW};
pub use schema::{Manifest, ManifestProject};
pub use watcher::ManifestWatcher;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! runner-engine: the process supervision core.
//!
//! One actor task per supervised project owns the child's whole lifetime:
//! it selects on child exit, control messages, watcher fires, and the
//! shutdown token, and is the only place a child is ever signalled from.
//! I/O pumps, the batched log writer, the stats sampler, and the restart
//! watcher feed it through channels.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod actor;
mod child;
mod error;
mod log_writer;
mod pty;
mod pumps;
mod stats;
mod supervisor;
mod watch;

pub use error::EngineError;
pub use stats::StatsCollector;
pub use supervisor::{Supervisor, GRACE_PERIOD, RESTART_DELAY};
pub use watch::RestartWatcher;

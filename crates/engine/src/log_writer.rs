// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batched log persistence.
//!
//! Pumps push chunks into a channel; this task drains them into the store
//! in one transaction per batch (up to 64 chunks or 100 ms of lag). Insert
//! failures are logged and swallowed — losing a log row must never affect
//! the child or the supervisor.

use std::time::Duration;

use runner_core::LogChunk;
use runner_storage::Database;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

const MAX_BATCH: usize = 64;
const FLUSH_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) fn spawn_log_writer(
    db: Database,
    mut rx: mpsc::Receiver<LogChunk>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut batch = Vec::with_capacity(MAX_BATCH);
        loop {
            // Block for the first chunk of a batch
            let Some(first) = rx.recv().await else {
                break;
            };
            batch.push(first);

            // Gather more until the batch fills or the flush window closes
            let deadline = tokio::time::Instant::now() + FLUSH_INTERVAL;
            while batch.len() < MAX_BATCH {
                match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(Some(chunk)) => batch.push(chunk),
                    Ok(None) | Err(_) => break,
                }
            }

            if let Err(e) = db.insert_logs(&batch) {
                warn!(error = %e, dropped = batch.len(), "log batch insert failed");
            }
            batch.clear();
        }
        // Channel closed: flush anything left
        if !batch.is_empty() {
            if let Err(e) = db.insert_logs(&batch) {
                warn!(error = %e, "final log flush failed");
            }
        }
    })
}

#[cfg(test)]
#[path = "log_writer_tests.rs"]
mod tests;

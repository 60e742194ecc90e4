// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event fanout: one mpsc intake from the engine and the manifest
//! watchers, broadcast out to every subscribed connection.

use runner_core::Event;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

const BROADCAST_CAP: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create the bus and the forwarder task draining `intake` into it.
    pub fn spawn(mut intake: mpsc::Receiver<Event>) -> (Self, JoinHandle<()>) {
        let (tx, _) = broadcast::channel(BROADCAST_CAP);
        let bus = Self { tx };
        let forward = bus.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = intake.recv().await {
                // No subscribers is fine; events are fire-and-forget
                let _ = forward.tx.send(event);
            }
            debug!("event intake closed");
        });
        (bus, task)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-cadence resource sampler.
//!
//! Every 2 seconds: one process-table refresh, then for each running
//! handle a BFS over parent→children from the root pid, summing CPU and
//! RSS across the tree. CPU is the raw tree aggregate; the UI decides
//! whether to normalize by core count.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use runner_core::{Event, MetricPoint, ProcessInfo, ProcessStatus};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::supervisor::{EngineShared, Supervisor};

pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(2);

pub struct StatsCollector;

impl StatsCollector {
    /// Run the sampler until engine shutdown. One task for the whole
    /// process; a slow tick delays the next one, it is never coalesced
    /// into a burst.
    pub fn spawn(supervisor: &Supervisor) -> JoinHandle<()> {
        let shared = supervisor.shared_arc();
        tokio::spawn(async move {
            let mut sys = System::new();
            let mut tick = tokio::time::interval(SAMPLE_INTERVAL);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = tick.tick() => {}
                    _ = shared.shutdown.cancelled() => break,
                }
                sample_once(&mut sys, &shared).await;
            }
            debug!("stats collector stopped");
        })
    }
}

async fn sample_once(sys: &mut System, shared: &Arc<EngineShared>) {
    let targets: Vec<ProcessInfo> = shared
        .statuses
        .lock()
        .values()
        .filter(|info| info.status == ProcessStatus::Running && info.pid.is_some())
        .cloned()
        .collect();
    if targets.is_empty() {
        return;
    }

    sys.refresh_processes(ProcessesToUpdate::All, true);
    let children = child_index(sys);

    let mut snapshot = Vec::with_capacity(targets.len());
    for mut info in targets {
        let Some(root) = info.pid else { continue };
        let (cpu, memory) = aggregate_tree(sys, &children, root);
        info.cpu = Some(cpu);
        info.memory = Some(memory);

        // Keep the shared snapshot current unless the project moved on
        {
            let mut statuses = shared.statuses.lock();
            if let Some(entry) = statuses.get_mut(&info.project_id) {
                if entry.status == ProcessStatus::Running && entry.pid == Some(root) {
                    entry.cpu = info.cpu;
                    entry.memory = info.memory;
                }
            }
        }

        if let Some(session_id) = &info.session_id {
            let point = MetricPoint {
                session_id: session_id.clone(),
                ts: Utc::now(),
                cpu,
                memory,
            };
            // Metric persistence failures never disturb sampling
            if let Err(e) = shared.db.insert_metric(&point) {
                warn!(session = %session_id, error = %e, "metric insert failed");
            }
        }
        snapshot.push(info);
    }

    let _ = shared.event_tx.send(Event::ProcessStatsUpdated { stats: snapshot }).await;
}

fn child_index(sys: &System) -> HashMap<u32, Vec<u32>> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (pid, process) in sys.processes() {
        if let Some(parent) = process.parent() {
            children.entry(parent.as_u32()).or_default().push(pid.as_u32());
        }
    }
    children
}

/// Sum CPU and RSS over the root and every descendant. A pid missing from
/// the table skips that subtree only.
fn aggregate_tree(sys: &System, children: &HashMap<u32, Vec<u32>>, root: u32) -> (f32, u64) {
    let mut cpu = 0.0f32;
    let mut memory = 0u64;
    let mut queue = vec![root];
    let mut seen = HashSet::new();
    while let Some(pid) = queue.pop() {
        if !seen.insert(pid) {
            continue;
        }
        let Some(process) = sys.process(Pid::from_u32(pid)) else {
            continue;
        };
        cpu += process.cpu_usage();
        memory += process.memory();
        if let Some(kids) = children.get(&pid) {
            queue.extend_from_slice(kids);
        }
    }
    (cpu, memory)
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker slot and per-pool connection-info shapes.

use serde::{Deserialize, Serialize};

/// What role a tracked child process plays in the Worker Registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    /// Long-lived query-routing worker (one of M slots).
    Query,
    /// Admin/PCP worker.
    Pcp,
    /// Generic periodic-task worker.
    Generic,
    /// Log collector.
    LogCollector,
    /// Watchdog peer-coordination child.
    Watchdog,
    /// Watchdog lifecheck child.
    WatchdogLifecheck,
    /// Per-backend health-check worker.
    HealthCheck,
    /// Short-lived follow-primary child (at most one at a time).
    FollowPrimary,
}

impl WorkerKind {
    /// Whether the reaper should respawn this kind by default (subject to
    /// the exit classification and `switching`/`exiting` gates).
    pub fn respawns_by_default(self) -> bool {
        !matches!(self, WorkerKind::FollowPrimary)
    }
}

/// One entry in a query worker's per-backend connection pool
/// (`per_pool_connection_info[P][N]`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub connected: bool,
    /// Backend node this pool slot is routed to.
    pub load_balancing_node: i32,
    pub backend_pid: i32,
}

/// One tracked child process slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSlot {
    pub kind: WorkerKind,
    /// Slot index — stable identity independent of `pid` across restarts.
    pub slot: usize,
    pub pid: Option<u32>,
    pub started_at_ms: u64,
    /// Set when a respawn was skipped because `switching`/`exiting` held;
    /// the worker is expected to self-exit at its next convenient point.
    pub need_restart: bool,
    /// Only populated for `WorkerKind::Query` slots: one row per
    /// configured backend pool.
    pub connections: Vec<ConnectionInfo>,
}

impl WorkerSlot {
    pub fn new(kind: WorkerKind, slot: usize, pool_depth: usize) -> Self {
        Self {
            kind,
            slot,
            pid: None,
            started_at_ms: 0,
            need_restart: false,
            connections: vec![ConnectionInfo::default(); pool_depth],
        }
    }

    pub fn is_running(&self) -> bool {
        self.pid.is_some()
    }

    /// Whether this query worker currently holds a connection routed to
    /// `node_id` — the Failover Engine's selective-restart predicate.
    pub fn routes_to(&self, node_id: i32) -> bool {
        self.connections.iter().any(|c| c.connected && c.load_balancing_node == node_id)
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watchdog Sync: reconciles local backend state against the cluster
//! leader's authoritative view. The peer transport that
//! actually fetches a status vector is an external collaborator
//! ([`WatchdogTransport`]); this module owns only the reconciliation rule.

use async_trait::async_trait;
use pgsup_core::backend::NodeId;
use pgsup_core::{BackendDescriptor, BackendStatus};
use pgsup_wire::{PeerBackendStatus, WatchdogStatusVector};

#[async_trait]
pub trait WatchdogTransport: Send + Sync + 'static {
    async fn fetch_leader_status(&self) -> Result<WatchdogStatusVector, pgsup_wire::ProtocolError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Status writes the caller should apply under the supervisor's normal
    /// write path (not through the request queue — Watchdog Sync writes
    /// `status` directly, same as the Failover Engine).
    pub status_updates: Vec<(NodeId, BackendStatus)>,
    /// Every local backend has `quarantined` cleared unconditionally: the
    /// leader is authoritative.
    pub clear_quarantine: Vec<NodeId>,
    pub new_primary_node_id: Option<i32>,
    pub full_restart: bool,
}

/// One reconciliation pass. `local` is the full backend table; the outcome
/// tells the caller what to write and whether the restart scope is full or
/// selective (selective restart targets are exactly the nodes transitioned
/// to `Down` in `status_updates`, mirroring the Failover Engine's own rule).
pub fn reconcile(
    local: &[BackendDescriptor],
    leader: &WatchdogStatusVector,
    current_primary_node_id: i32,
    streaming_replication_mode: bool,
) -> ReconcileOutcome {
    let mut status_updates = Vec::new();
    let clear_quarantine: Vec<NodeId> = local.iter().map(|b| b.id).collect();

    for backend in local {
        let Some(report) = leader.backends.iter().find(|r| r.node_id == backend.id) else {
            continue;
        };
        let leader_down = matches!(report.status, PeerBackendStatus::Down);
        let local_down = matches!(backend.status, BackendStatus::Down);
        if leader_down && !local_down {
            status_updates.push((backend.id, BackendStatus::Down));
        } else if !leader_down && local_down {
            status_updates.push((backend.id, BackendStatus::ConnectWait));
        }
    }

    let local_primary_alive = local.iter().any(|b| b.id == current_primary_node_id && b.is_valid());

    let new_primary_node_id = if streaming_replication_mode {
        if leader.primary_node_id == -1 && local_primary_alive {
            Some(current_primary_node_id)
        } else {
            Some(leader.primary_node_id)
        }
    } else {
        None
    };

    let primary_changed = streaming_replication_mode
        && new_primary_node_id.is_some_and(|p| p != current_primary_node_id);
    let full_restart = primary_changed || !streaming_replication_mode;

    ReconcileOutcome { status_updates, clear_quarantine, new_primary_node_id, full_restart }
}

/// `WATCHDOG_QUORUM_CHANGED`, quorum regained: every quarantined backend
/// gets a failback request reissued.
pub fn quorum_regained_failback_targets(local: &[BackendDescriptor]) -> Vec<NodeId> {
    local.iter().filter(|b| b.quarantined).map(|b| b.id).collect()
}

/// `INFORM_QUARANTINE_NODES`: every quarantined backend degenerates
/// straight to `Down`, bypassing the request queue.
pub fn inform_quarantine_down_targets(local: &[BackendDescriptor]) -> Vec<NodeId> {
    local.iter().filter(|b| b.quarantined).map(|b| b.id).collect()
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;

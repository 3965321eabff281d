// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message shapes exchanged with the watchdog cluster-membership service.

use pgsup_core::backend::NodeId;
use serde::{Deserialize, Serialize};

/// One backend's status as reported by a peer, not this process's own
/// `BackendDescriptor` — deliberately narrower, since a peer reports only
/// what Watchdog Sync needs to reconcile against (status, not role or
/// quarantine, which are derived locally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerBackendStatus {
    Up,
    Down,
    ConnectWait,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatusReport {
    pub node_id: NodeId,
    pub status: PeerBackendStatus,
}

/// The authoritative status vector a cluster leader reports, pulled by
/// Watchdog Sync on `WATCHDOG_STATE_CHANGED` or `BACKEND_SYNC_REQUIRED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogStatusVector {
    pub backends: Vec<BackendStatusReport>,
    /// `-1` if the leader has no opinion.
    pub primary_node_id: i32,
}

/// Messages exchanged with peer supervisors over the watchdog transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WatchdogMessage {
    /// `wd_failover_start`: tells peers to quiesce conflicting operations
    /// before a local failover transition is applied.
    FailoverStart { node_ids: Vec<NodeId> },
    FailoverEnd { node_ids: Vec<NodeId> },
    /// Response to a status-vector pull.
    StatusReport(WatchdogStatusVector),
    QuorumChanged { quorum_held: bool },
    /// A remote follow-primary lock request or release.
    FollowPrimaryLock { acquire: bool },
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node-state-change requests, queued by any process and drained only by
//! the supervisor's Failover Engine.

use crate::backend::NodeId;
use serde::{Deserialize, Serialize};

/// The kind of node-state transition requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    NodeUp,
    NodeDown,
    Promote,
    Quarantine,
    CloseIdle,
}

/// Flags modifying how a request is processed. Bitflags-shaped but kept as
/// a plain struct of named bools: there are only four, each named by a
/// distinct English word, not by bit position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFlags {
    /// Operator-initiated; may skip restart of workers unaffected by the
    /// transition.
    pub switchover: bool,
    /// Requeue after a quarantine clears (failback path).
    pub update: bool,
    /// Producer is trusted (e.g. Primary Finder enqueuing a demotion of a
    /// confirmed false primary); bypasses re-validation a less-trusted
    /// producer would need.
    pub confirmed: bool,
    /// Originated from peer watchdog sync rather than a local decision.
    pub watchdog: bool,
}

impl RequestFlags {
    pub const NONE: Self = Self { switchover: false, update: false, confirmed: false, watchdog: false };

    pub fn switchover() -> Self {
        Self { switchover: true, ..Self::NONE }
    }

    pub fn switchover_confirmed() -> Self {
        Self { switchover: true, confirmed: true, ..Self::NONE }
    }

    pub fn update() -> Self {
        Self { update: true, ..Self::NONE }
    }

    pub fn watchdog() -> Self {
        Self { watchdog: true, ..Self::NONE }
    }
}

/// A single queued node-state-change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStateRequest {
    pub kind: RequestKind,
    pub node_ids: Vec<NodeId>,
    pub flags: RequestFlags,
}

impl NodeStateRequest {
    pub fn new(kind: RequestKind, node_ids: Vec<NodeId>) -> Self {
        Self { kind, node_ids, flags: RequestFlags::NONE }
    }

    pub fn with_flags(mut self, flags: RequestFlags) -> Self {
        self.flags = flags;
        self
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend descriptors: the per-database-node view the supervisor maintains.

use serde::{Deserialize, Serialize};

/// 0-based backend node identifier.
pub type NodeId = i32;

/// Reachability state of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    Unused,
    ConnectWait,
    Up,
    Down,
}

crate::simple_display! {
    BackendStatus {
        Unused => "unused",
        ConnectWait => "waiting",
        Up => "up",
        Down => "down",
    }
}

impl BackendStatus {
    /// Whether a backend in this status is addressable (subject also to
    /// `quarantined == false`, checked separately by the caller).
    pub fn is_valid(self) -> bool {
        matches!(self, BackendStatus::ConnectWait | BackendStatus::Up)
    }
}

/// Replication role, as last determined by the Primary Finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendRole {
    Primary,
    Standby,
    Unknown,
}

/// Per-backend static flags from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendFlags {
    /// This node is always treated as primary regardless of probe results.
    pub always_primary: bool,
    /// This node is never selected as a failover target.
    pub disallow_to_failover: bool,
}

/// A single backend database node tracked by the supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
    pub data_directory: String,
    pub flags: BackendFlags,
    pub status: BackendStatus,
    pub role: BackendRole,
    /// Unreachable but failover deferred pending cluster quorum.
    pub quarantined: bool,
    /// Monotonically updated whenever `status` is written.
    pub status_changed_at_ms: u64,
}

impl BackendDescriptor {
    pub fn new(id: NodeId, host: impl Into<String>, port: u16, data_directory: impl Into<String>) -> Self {
        Self {
            id,
            host: host.into(),
            port,
            data_directory: data_directory.into(),
            flags: BackendFlags::default(),
            status: BackendStatus::Unused,
            role: BackendRole::Unknown,
            quarantined: false,
            status_changed_at_ms: 0,
        }
    }

    /// Addressable: valid status and not quarantined.
    pub fn is_valid(&self) -> bool {
        self.status.is_valid() && !self.quarantined
    }

    /// Set `status`, stamping `status_changed_at_ms` in the same write
    /// ("status_changed_at is monotonically updated on every
    /// status write").
    pub fn set_status(&mut self, status: BackendStatus, now_ms: u64) {
        self.status = status;
        self.status_changed_at_ms = self.status_changed_at_ms.max(now_ms);
    }

    pub fn host_port(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    /// `localhost` and a Unix-socket host are treated as equivalent when
    /// comparing a standby's reported upstream to a candidate primary
    /// ownership confirmation.
    pub fn matches_host(&self, host: &str, port: u16) -> bool {
        if self.port != port {
            return false;
        }
        let is_local = |h: &str| h == "localhost" || h.starts_with('/');
        self.host == host || (is_local(&self.host) && is_local(host))
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;

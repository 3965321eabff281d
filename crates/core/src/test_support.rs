// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only builders for the domain types in this crate, shared by every
//! downstream crate's test suite (gated behind `test-support`).

use crate::backend::{BackendDescriptor, BackendFlags, BackendRole, BackendStatus, NodeId};
use crate::request::{NodeStateRequest, RequestFlags, RequestKind};
use crate::worker::{ConnectionInfo, WorkerKind, WorkerSlot};

crate::builder! {
    pub struct BackendDescriptorBuilder => BackendDescriptor {
        set { id: NodeId = 0 }
        into { host: String = "localhost" }
        set { port: u16 = 5432 }
        into { data_directory: String = "/var/lib/postgresql/data" }
        set { flags: BackendFlags = BackendFlags::default() }
        set { status: BackendStatus = BackendStatus::Unused }
        set { role: BackendRole = BackendRole::Unknown }
        set { quarantined: bool = false }
        set { status_changed_at_ms: u64 = 0 }
    }
}

crate::builder! {
    pub struct NodeStateRequestBuilder => NodeStateRequest {
        set { kind: RequestKind = RequestKind::NodeDown }
        set { node_ids: Vec<NodeId> = Vec::new() }
        set { flags: RequestFlags = RequestFlags::NONE }
    }
}

crate::builder! {
    pub struct WorkerSlotBuilder => WorkerSlot {
        set { kind: WorkerKind = WorkerKind::Query }
        set { slot: usize = 0 }
        option { pid: u32 = None }
        set { started_at_ms: u64 = 0 }
        set { need_restart: bool = false }
        set { connections: Vec<ConnectionInfo> = Vec::new() }
    }
}

/// A handful of `ConnectWait` backends, the shape most tests start from.
pub fn sample_backends(count: usize) -> Vec<BackendDescriptor> {
    (0..count as NodeId)
        .map(|id| {
            BackendDescriptor::builder()
                .id(id)
                .port(5432 + id as u16)
                .status(BackendStatus::ConnectWait)
                .build()
        })
        .collect()
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared-state region: backend descriptors, worker
//! slots, signal flags, and the fields the original guarded behind
//! `REQUEST_INFO_SEM` and `FOLLOW_PRIMARY_SEM`.
//!
//! Each named semaphore in the source becomes exactly one `parking_lot`
//! lock here, guarding exactly the substructure it guarded there. Backend
//! and worker tables get their own `RwLock`: every process reads them far
//! more often than the supervisor writes them, and only the supervisor ever
//! writes `status`.

use pgsup_core::{BackendDescriptor, GlobalRequestInfo, SignalSlot, WorkerSlot};
use parking_lot::{Mutex, RwLock};

use crate::queue::{EnqueueOutcome, RequestQueue};

/// Fields guarded together by `REQUEST_INFO_SEM`: the queue itself, plus
/// `switching`, `main_node_id`, and `primary_node_id`.
#[derive(Debug)]
pub struct RequestInfo {
    pub queue: RequestQueue,
    pub switching: bool,
    pub main_node_id: i32,
    pub primary_node_id: i32,
}

impl RequestInfo {
    fn new(queue_capacity: usize) -> Self {
        Self {
            queue: RequestQueue::new(queue_capacity),
            switching: false,
            main_node_id: -1,
            primary_node_id: -1,
        }
    }
}

/// Fields guarded together by `FOLLOW_PRIMARY_SEM`.
#[derive(Debug, Default)]
pub struct FollowPrimaryState {
    pub ongoing: bool,
    pub count: u8,
    pub held_remotely: bool,
    pub pending: bool,
}

/// The at-most-one-shutdown gate (`MAIN_EXIT_HANDLER_SEM`).
#[derive(Debug, Default)]
pub struct ExitGuard {
    pub exiting: bool,
}

pub struct SharedState {
    backends: RwLock<Vec<BackendDescriptor>>,
    workers: RwLock<Vec<WorkerSlot>>,
    signals: Mutex<SignalSlot>,
    request_info: Mutex<RequestInfo>,
    follow_primary: Mutex<FollowPrimaryState>,
    exit: Mutex<ExitGuard>,
}

impl SharedState {
    pub fn new(backends: Vec<BackendDescriptor>, workers: Vec<WorkerSlot>, queue_capacity: usize) -> Self {
        Self {
            backends: RwLock::new(backends),
            workers: RwLock::new(workers),
            signals: Mutex::new(SignalSlot::default()),
            request_info: Mutex::new(RequestInfo::new(queue_capacity)),
            follow_primary: Mutex::new(FollowPrimaryState::default()),
            exit: Mutex::new(ExitGuard::default()),
        }
    }

    pub fn backends(&self) -> &RwLock<Vec<BackendDescriptor>> {
        &self.backends
    }

    pub fn workers(&self) -> &RwLock<Vec<WorkerSlot>> {
        &self.workers
    }

    pub fn signals(&self) -> &Mutex<SignalSlot> {
        &self.signals
    }

    pub fn request_info(&self) -> &Mutex<RequestInfo> {
        &self.request_info
    }

    pub fn follow_primary(&self) -> &Mutex<FollowPrimaryState> {
        &self.follow_primary
    }

    pub fn exit(&self) -> &Mutex<ExitGuard> {
        &self.exit
    }

    /// Enqueue a request under `REQUEST_INFO_SEM`. Intentionally does not
    /// itself decide whether the caller should drain immediately
    /// or signal the supervisor — that policy lives in the engine, which
    /// knows whether it *is* the supervisor.
    pub fn enqueue(&self, request: pgsup_core::NodeStateRequest) -> EnqueueOutcome {
        self.request_info.lock().queue.enqueue(request)
    }

    /// A point-in-time composite view for reporting and tests; never held
    /// as the basis for a subsequent write (each field's own lock is the
    /// source of truth).
    pub fn snapshot_global(&self) -> GlobalRequestInfo {
        let ri = self.request_info.lock();
        let fp = self.follow_primary.lock();
        GlobalRequestInfo {
            main_node_id: ri.main_node_id,
            primary_node_id: ri.primary_node_id,
            switching: ri.switching,
            follow_primary_ongoing: fp.ongoing,
            follow_primary_count: fp.count,
            follow_primary_lock_held_remotely: fp.held_remotely,
            follow_primary_lock_pending: fp.pending,
        }
    }
}

#[cfg(test)]
#[path = "region_tests.rs"]
mod tests;

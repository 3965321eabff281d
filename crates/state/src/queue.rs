// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded FIFO of node-state-change requests. Producers may
//! be any process; draining is the Failover Engine's exclusive job.

use pgsup_core::NodeStateRequest;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Ok,
    Full,
}

/// A ring of capacity `Q`. Implemented over `VecDeque` rather than raw
/// head/tail indices into a fixed array: the queue lives in this process's
/// heap, not in a region mapped across processes, so there is no layout
/// constraint forcing a flat array.
#[derive(Debug, Clone)]
pub struct RequestQueue {
    items: VecDeque<NodeStateRequest>,
    capacity: usize,
}

impl RequestQueue {
    pub fn new(capacity: usize) -> Self {
        Self { items: VecDeque::with_capacity(capacity), capacity }
    }

    /// Appends `request` unless the queue is at capacity. Does not mutate
    /// the queue on `Full`.
    pub fn enqueue(&mut self, request: NodeStateRequest) -> EnqueueOutcome {
        if self.items.len() >= self.capacity {
            return EnqueueOutcome::Full;
        }
        self.items.push_back(request);
        EnqueueOutcome::Ok
    }

    /// Pops the oldest request, if any.
    pub fn dequeue(&mut self) -> Option<NodeStateRequest> {
        self.items.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

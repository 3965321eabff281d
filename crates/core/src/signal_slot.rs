// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `SignalSlot`: one-bit flags set by any process, drained by the
//! supervisor in a fixed priority order.

/// Drain priority, highest first, in the order the supervisor acts on them:
/// `QUORUM_CHANGED → INFORM_QUARANTINE_NODES → BACKEND_SYNC_REQUIRED →
/// WATCHDOG_STATE_CHANGED → FAILOVER_INTERRUPT`.
pub const DRAIN_ORDER: [SignalFlag; 5] = [
    SignalFlag::WatchdogQuorumChanged,
    SignalFlag::InformQuarantineNodes,
    SignalFlag::BackendSyncRequired,
    SignalFlag::WatchdogStateChanged,
    SignalFlag::FailoverInterrupt,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalFlag {
    FailoverInterrupt,
    WatchdogStateChanged,
    BackendSyncRequired,
    WatchdogQuorumChanged,
    InformQuarantineNodes,
}

/// The set of pending signal flags. Each bit is set by `set()` (any
/// process) and cleared by `take()` (supervisor only, one flag at a time
/// in `DRAIN_ORDER`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalSlot {
    failover_interrupt: bool,
    watchdog_state_changed: bool,
    backend_sync_required: bool,
    watchdog_quorum_changed: bool,
    inform_quarantine_nodes: bool,
}

impl SignalSlot {
    pub fn set(&mut self, flag: SignalFlag) {
        *self.field_mut(flag) = true;
    }

    pub fn is_set(&self, flag: SignalFlag) -> bool {
        *self.field(flag)
    }

    /// Clear `flag` and return whether it had been set. Callers drain in
    /// `DRAIN_ORDER` and act on the first flag found set.
    pub fn take(&mut self, flag: SignalFlag) -> bool {
        let field = self.field_mut(flag);
        std::mem::take(field)
    }

    pub fn any_set(&self) -> bool {
        DRAIN_ORDER.iter().any(|f| self.is_set(*f))
    }

    /// The next flag to act on, in fixed priority order, without clearing
    /// it yet.
    pub fn peek_next(&self) -> Option<SignalFlag> {
        DRAIN_ORDER.into_iter().find(|f| self.is_set(*f))
    }

    fn field(&self, flag: SignalFlag) -> &bool {
        match flag {
            SignalFlag::FailoverInterrupt => &self.failover_interrupt,
            SignalFlag::WatchdogStateChanged => &self.watchdog_state_changed,
            SignalFlag::BackendSyncRequired => &self.backend_sync_required,
            SignalFlag::WatchdogQuorumChanged => &self.watchdog_quorum_changed,
            SignalFlag::InformQuarantineNodes => &self.inform_quarantine_nodes,
        }
    }

    fn field_mut(&mut self, flag: SignalFlag) -> &mut bool {
        match flag {
            SignalFlag::FailoverInterrupt => &mut self.failover_interrupt,
            SignalFlag::WatchdogStateChanged => &mut self.watchdog_state_changed,
            SignalFlag::BackendSyncRequired => &mut self.backend_sync_required,
            SignalFlag::WatchdogQuorumChanged => &mut self.watchdog_quorum_changed,
            SignalFlag::InformQuarantineNodes => &mut self.inform_quarantine_nodes,
        }
    }
}

#[cfg(test)]
#[path = "signal_slot_tests.rs"]
mod tests;

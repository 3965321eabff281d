// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn peek_next_honours_fixed_priority() {
    let mut slot = SignalSlot::default();
    slot.set(SignalFlag::FailoverInterrupt);
    slot.set(SignalFlag::BackendSyncRequired);
    // BackendSyncRequired outranks FailoverInterrupt per DRAIN_ORDER.
    assert_eq!(slot.peek_next(), Some(SignalFlag::BackendSyncRequired));

    slot.set(SignalFlag::WatchdogQuorumChanged);
    assert_eq!(slot.peek_next(), Some(SignalFlag::WatchdogQuorumChanged));
}

#[test]
fn take_clears_only_the_named_flag() {
    let mut slot = SignalSlot::default();
    slot.set(SignalFlag::FailoverInterrupt);
    slot.set(SignalFlag::WatchdogStateChanged);

    assert!(slot.take(SignalFlag::FailoverInterrupt));
    assert!(!slot.is_set(SignalFlag::FailoverInterrupt));
    assert!(slot.is_set(SignalFlag::WatchdogStateChanged));
    assert!(!slot.take(SignalFlag::FailoverInterrupt), "already cleared");
}

#[test]
fn any_set_reflects_pending_flags() {
    let mut slot = SignalSlot::default();
    assert!(!slot.any_set());
    slot.set(SignalFlag::InformQuarantineNodes);
    assert!(slot.any_set());
}

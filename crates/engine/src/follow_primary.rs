// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Follow-Primary Lock: mutual exclusion between follow-primary execution
//! and false-primary detach logic. Wraps
//! [`pgsup_state::region::FollowPrimaryState`] with the acquire/release
//! state machine; the region only stores the bits.

use parking_lot::{Condvar, Mutex};
use pgsup_state::region::FollowPrimaryState;
use std::time::Duration;

pub struct FollowPrimaryLock<'a> {
    state: &'a Mutex<FollowPrimaryState>,
    condvar: Condvar,
}

impl<'a> FollowPrimaryLock<'a> {
    pub fn new(state: &'a Mutex<FollowPrimaryState>) -> Self {
        Self { state, condvar: Condvar::new() }
    }

    /// `block`: local callers may wait for the lock to free up.
    /// `remote_request`: remote acquisitions never block; if the lock is
    /// already held they set `pending` and return `false`.
    pub fn acquire(&self, block: bool, remote_request: bool) -> bool {
        let mut guard = self.state.lock();
        loop {
            if guard.count == 0 {
                guard.count = 1;
                guard.held_remotely = remote_request;
                guard.ongoing = true;
                return true;
            }
            if remote_request {
                if guard.held_remotely {
                    tracing::warn!("remote follow-primary lock requested while already held remotely");
                } else {
                    guard.pending = true;
                }
                return false;
            }
            if !block {
                return false;
            }
            self.condvar.wait_for(&mut guard, Duration::from_millis(100));
        }
    }

    /// `remote_request` distinguishes a remote release (only clears a
    /// remotely held lock; idle is a no-op) from a local release (transfers
    /// the lock to a pending remote requester if one exists, otherwise
    /// frees it).
    pub fn release(&self, remote_request: bool) {
        let mut guard = self.state.lock();
        if remote_request {
            if guard.held_remotely {
                guard.count = 0;
                guard.held_remotely = false;
                guard.ongoing = false;
            }
            guard.pending = false;
            self.condvar.notify_all();
            return;
        }
        if guard.pending {
            guard.held_remotely = true;
            guard.pending = false;
            // count stays 1, ongoing stays true: the lock transfers, it
            // does not free.
        } else {
            guard.count = 0;
            guard.ongoing = false;
            guard.held_remotely = false;
        }
        self.condvar.notify_all();
    }
}

#[cfg(test)]
#[path = "follow_primary_tests.rs"]
mod tests;

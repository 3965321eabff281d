// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GlobalRequestInfo`: the fields written only under the request-info
//! mutex.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalRequestInfo {
    /// Lowest-indexed valid backend; `-1` if none.
    pub main_node_id: i32,
    /// Current primary backend; `-1` if unknown.
    pub primary_node_id: i32,
    /// Held for the entire drain of the request queue.
    pub switching: bool,
    pub follow_primary_ongoing: bool,
    pub follow_primary_count: u8,
    pub follow_primary_lock_held_remotely: bool,
    pub follow_primary_lock_pending: bool,
}

impl Default for GlobalRequestInfo {
    fn default() -> Self {
        Self {
            main_node_id: -1,
            primary_node_id: -1,
            switching: false,
            follow_primary_ongoing: false,
            follow_primary_count: 0,
            follow_primary_lock_held_remotely: false,
            follow_primary_lock_pending: false,
        }
    }
}

#[cfg(test)]
#[path = "global_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pgsup-state: the shared-state region, request queue, and status-file
//! persistence.
//!
//! The supervisor is a single OS process sharing one logical state region
//! with the worker fleet's forked children. Here that region is one process's
//! memory, not mapped shared memory, so the named semaphores of the original
//! design become [`parking_lot`] locks with matching scope: one lock per
//! independently-updatable substructure, never a single global lock.

pub mod error;
pub mod persistence;
pub mod queue;
pub mod region;

pub use error::StateError;
pub use persistence::StatusFile;
pub use queue::{EnqueueOutcome, RequestQueue};
pub use region::SharedState;

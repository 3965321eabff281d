// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pgsup-engine: the failover decision and execution layer. Owns the
//! Worker Registry (fork policy + reaper), the Primary Finder, the
//! Follow-Primary Lock, Watchdog Sync reconciliation, command templating,
//! and the Failover Engine that ties them together.

pub mod commands;
pub mod error;
pub mod failover;
pub mod follow_primary;
pub mod primary_finder;
pub mod registry;
pub mod watchdog;

pub use commands::{CommandContext, NodeRef};
pub use error::{EngineError, Result};
pub use failover::{get_next_main_node, FailoverEngine, FailoverOutcome, PeerCoordinator, RestartScope};
pub use follow_primary::FollowPrimaryLock;
pub use primary_finder::{
    find_primary_node_with_retry, resolve_once, Classification, FindResult, PrimaryProbe, ProbeError,
    ResolutionOutcome, ServerVersion, WalReceiverStatus,
};
pub use registry::{ExitClass, WorkerLauncher, WorkerRegistry, FATAL_EXIT_CODE, NO_RESTART_EXIT_CODE};
pub use watchdog::{
    inform_quarantine_down_targets, quorum_regained_failback_targets, reconcile, ReconcileOutcome, WatchdogTransport,
};

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Primary Finder: probes every valid backend, classifies it, and resolves
//! split-brain. Connecting to a real backend and running
//! `SELECT pg_is_in_recovery()` / `pg_stat_wal_receiver` is an external
//! collaborator's job ([`PrimaryProbe`]); this module only owns the
//! classification and resolution rules.

use async_trait::async_trait;
use pgsup_core::backend::NodeId;
use pgsup_core::BackendDescriptor;
use std::time::{Duration, Instant};

/// Minimum server version (9.6.0, as three components) at which
/// `pg_stat_wal_receiver` confirmation becomes possible.
pub const MIN_VERSION_FOR_WAL_RECEIVER_CHECK: (u32, u32, u32) = (9, 6, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion(pub u32, pub u32, pub u32);

#[derive(Debug, Clone)]
pub struct WalReceiverStatus {
    pub streaming: bool,
    pub sender_host: String,
    pub sender_port: u16,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}

/// What a single probe round learns about one backend. Connection failure
/// is not an error variant here — a non-respondent backend is simply
/// classified `Unused` — a transient backend connection failure is
/// treated as the node simply not respondent.
#[async_trait]
pub trait PrimaryProbe: Send + Sync + 'static {
    async fn is_in_recovery(&self, backend: &BackendDescriptor) -> Result<bool, ProbeError>;
    async fn server_version(&self, backend: &BackendDescriptor) -> Result<ServerVersion, ProbeError>;
    async fn wal_receiver_status(
        &self,
        backend: &BackendDescriptor,
    ) -> Result<Option<WalReceiverStatus>, ProbeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Primary,
    Standby,
    Unused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOutcome {
    /// `None` means no primary was found this round; the caller retries.
    pub primary: Option<NodeId>,
    /// Nodes the caller should enqueue `NODE_DOWN(SWITCHOVER|CONFIRMED)`
    /// for — extra primaries beaten out by the lowest-indexed one, or a
    /// primary that doesn't own all of its standbys.
    pub invalid: Vec<NodeId>,
}

/// One probe-and-resolve round against every backend in `candidates`
/// (already filtered to `is_valid()` by the caller).
pub async fn resolve_once(
    probe: &dyn PrimaryProbe,
    candidates: &[BackendDescriptor],
    detach_false_primary: bool,
) -> ResolutionOutcome {
    let mut primaries = Vec::new();
    let mut standbys = Vec::new();
    for backend in candidates {
        match probe.is_in_recovery(backend).await {
            Ok(false) => primaries.push(backend),
            Ok(true) => standbys.push(backend),
            Err(e) => {
                tracing::info!(node_id = backend.id, error = %e, "probe did not respond, treating as unused");
            }
        }
    }

    if primaries.is_empty() {
        return ResolutionOutcome { primary: None, invalid: Vec::new() };
    }

    if primaries.len() == 1 {
        let primary = primaries[0];
        if standbys.is_empty() {
            return ResolutionOutcome { primary: Some(primary.id), invalid: Vec::new() };
        }
        let owned = owned_standby_count(probe, primary, &standbys).await;
        if detach_false_primary && owned < standbys.len() {
            tracing::warn!(node_id = primary.id, owned, total = standbys.len(), "primary does not own all standbys");
            return ResolutionOutcome { primary: None, invalid: vec![primary.id] };
        }
        return ResolutionOutcome { primary: Some(primary.id), invalid: Vec::new() };
    }

    // Split brain: trust the lowest-indexed primary, the rest are invalid
    // candidates for demotion if configured to act automatically.
    primaries.sort_by_key(|b| b.id);
    let trusted = primaries[0];
    let invalid: Vec<NodeId> = primaries[1..]
        .iter()
        .map(|b| b.id)
        .filter(|_| detach_false_primary)
        .collect();
    if invalid.is_empty() {
        tracing::warn!(trusted = trusted.id, count = primaries.len(), "split brain detected, detach_false_primary disabled");
    } else {
        tracing::warn!(trusted = trusted.id, ?invalid, "split brain detected, demoting false primaries");
    }
    ResolutionOutcome { primary: Some(trusted.id), invalid }
}

/// How many of `standbys` report `status = 'streaming'` from `primary`'s
/// `host:port` (only checked on servers new enough to expose
/// `pg_stat_wal_receiver`).
async fn owned_standby_count(
    probe: &dyn PrimaryProbe,
    primary: &BackendDescriptor,
    standbys: &[&BackendDescriptor],
) -> usize {
    let mut owned = 0;
    for standby in standbys {
        let version = match probe.server_version(standby).await {
            Ok(v) => v,
            Err(_) => continue,
        };
        if (version.0, version.1, version.2) < MIN_VERSION_FOR_WAL_RECEIVER_CHECK {
            // Too old to confirm; assume ownership rather than falsely
            // demoting a primary we cannot actually disprove.
            owned += 1;
            continue;
        }
        match probe.wal_receiver_status(standby).await {
            Ok(Some(status)) if status.streaming && primary.matches_host(&status.sender_host, status.sender_port) => {
                owned += 1;
            }
            _ => {}
        }
    }
    owned
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindResult {
    /// Found a primary; the accompanying node ids should each have
    /// `NODE_DOWN(SWITCHOVER|CONFIRMED)` enqueued for them (split-brain
    /// demotions decided in the same round).
    Found(NodeId, Vec<NodeId>),
    /// Every backend is down; the caller must not retry.
    AllDown,
    /// `search_primary_node_timeout` elapsed with no primary found.
    TimedOut,
    /// A follow-primary operation is in flight; returns the unchanged
    /// current primary rather than probing.
    FollowPrimaryOngoing(i32),
}

/// The retry wrapper: probes at 1-second intervals until
/// a primary is found, the timeout expires (`0` = infinite), or every
/// backend is down.
pub async fn find_primary_node_with_retry(
    probe: &dyn PrimaryProbe,
    mut candidates_fn: impl FnMut() -> Vec<BackendDescriptor>,
    detach_false_primary: bool,
    timeout: Duration,
    current_primary_node_id: i32,
    follow_primary_ongoing: bool,
) -> FindResult {
    if follow_primary_ongoing {
        return FindResult::FollowPrimaryOngoing(current_primary_node_id);
    }
    let start = Instant::now();
    loop {
        let candidates = candidates_fn();
        if candidates.is_empty() {
            return FindResult::AllDown;
        }
        let outcome = resolve_once(probe, &candidates, detach_false_primary).await;
        if let Some(id) = outcome.primary {
            return FindResult::Found(id, outcome.invalid);
        }
        if !timeout.is_zero() && start.elapsed() >= timeout {
            return FindResult::TimedOut;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

#[cfg(test)]
#[path = "primary_finder_tests.rs"]
mod tests;

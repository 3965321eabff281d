// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor main loop: wakes on [`SignalRouter`] events and reacts to
//! exactly one of them at a time, same discipline the self-pipe `select`
//! enforced — nothing here runs concurrently with anything else that
//! touches `SharedState`'s write path.

use pgsup_core::signal_slot::SignalFlag;
use pgsup_core::{now_ms, Config, NodeStateRequest, RequestFlags, RequestKind};
use pgsup_engine::{
    inform_quarantine_down_targets, quorum_regained_failback_targets, reconcile, FailoverEngine, PeerCoordinator,
    PrimaryProbe, WatchdogTransport, WorkerLauncher, WorkerRegistry,
};
use pgsup_state::persistence::PersistedStatus;
use pgsup_state::{SharedState, StatusFile};

use crate::error::Result;
use crate::lifecycle;
use crate::signal_router::{RouterEvent, SignalRouter};
use crate::sockets::BoundSockets;

/// Reaps exited children, returning the fatal exit code if the reaper hit a
/// `FATAL`-classified exit — the one case spec.md's error-handling design
/// propagates by terminating the supervisor.
fn reap<L: WorkerLauncher>(registry: &WorkerRegistry<L>, state: &SharedState) -> Option<i32> {
    let switching = state.request_info().lock().switching;
    let exiting = state.exit().lock().exiting;
    match registry.reap_exited(state, switching || exiting) {
        Ok(_) => None,
        Err(pgsup_engine::EngineError::ChildFatal(code)) => Some(code),
        Err(e) => {
            tracing::error!(error = %e, "reap failed");
            None
        }
    }
}

/// One reconciliation pass against the watchdog leader's status vector,
/// for both `BACKEND_SYNC_REQUIRED` (locally initiated) and
/// `WATCHDOG_STATE_CHANGED` (peer-initiated) — both resolve to the same
/// rule, just triggered from a different side.
async fn reconcile_with_leader<W: WatchdogTransport>(
    state: &SharedState,
    watchdog: &W,
    config: &Config,
    status_file: &StatusFile,
) {
    let vector = match watchdog.fetch_leader_status().await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "failed to fetch watchdog leader status");
            return;
        }
    };

    let primary_node_id = state.request_info().lock().primary_node_id;
    let outcome = {
        let backends = state.backends().read();
        reconcile(&backends, &vector, primary_node_id, config.streaming_replication_mode)
    };

    if !outcome.status_updates.is_empty() || !outcome.clear_quarantine.is_empty() {
        let now = now_ms();
        let mut backends = state.backends().write();
        for (id, status) in &outcome.status_updates {
            if let Some(b) = backends.iter_mut().find(|b| b.id == *id) {
                b.set_status(*status, now);
            }
        }
        for id in &outcome.clear_quarantine {
            if let Some(b) = backends.iter_mut().find(|b| b.id == *id) {
                b.quarantined = false;
            }
        }
    }
    if let Some(new_primary) = outcome.new_primary_node_id {
        state.request_info().lock().primary_node_id = new_primary;
    }
    if outcome.full_restart {
        let mut workers = state.workers().write();
        for slot in workers.iter_mut() {
            slot.need_restart = true;
        }
    }

    if !outcome.status_updates.is_empty() || !outcome.clear_quarantine.is_empty() {
        let statuses: Vec<_> =
            state.backends().read().iter().map(|b| PersistedStatus::from_backend_status(b.status)).collect();
        if let Err(e) = status_file.save(&statuses) {
            tracing::warn!(error = %e, "failed to persist status file after watchdog reconciliation");
        }
    }
}

/// Acts on the single highest-priority pending `SignalSlot` flag, clearing
/// it first. Returns whether a flag was found — `Sigusr1` handling loops
/// on this until it returns `false` for one full pass, honoring re-arm
/// during processing.
async fn drain_one_signal_slot<P, C, W, L>(
    state: &SharedState,
    engine: &FailoverEngine<'_, P, C, L>,
    watchdog: &W,
    config: &Config,
    status_file: &StatusFile,
) -> bool
where
    P: PrimaryProbe,
    C: PeerCoordinator,
    W: WatchdogTransport,
    L: WorkerLauncher,
{
    let flag = {
        let mut signals = state.signals().lock();
        let Some(flag) = signals.peek_next() else { return false };
        signals.take(flag);
        flag
    };

    match flag {
        SignalFlag::WatchdogQuorumChanged => {
            let targets = {
                let backends = state.backends().read();
                quorum_regained_failback_targets(&backends)
            };
            for id in targets {
                let request = NodeStateRequest::new(RequestKind::NodeUp, vec![id]).with_flags(RequestFlags::watchdog());
                if matches!(state.enqueue(request), pgsup_state::EnqueueOutcome::Full) {
                    tracing::warn!(node_id = id, "request queue full, dropped failback on quorum regained");
                }
            }
            if let Err(e) = engine.drain().await {
                tracing::error!(error = %e, "drain failed after quorum regained");
            }
        }
        SignalFlag::InformQuarantineNodes => {
            let targets = {
                let backends = state.backends().read();
                inform_quarantine_down_targets(&backends)
            };
            for id in targets {
                let request = NodeStateRequest::new(RequestKind::NodeDown, vec![id]).with_flags(RequestFlags::watchdog());
                if matches!(state.enqueue(request), pgsup_state::EnqueueOutcome::Full) {
                    tracing::warn!(node_id = id, "request queue full, dropped quarantine-down notice");
                }
            }
            if let Err(e) = engine.drain().await {
                tracing::error!(error = %e, "drain failed after quarantine notice");
            }
        }
        SignalFlag::BackendSyncRequired | SignalFlag::WatchdogStateChanged => {
            reconcile_with_leader(state, watchdog, config, status_file).await;
        }
        SignalFlag::FailoverInterrupt => {
            if let Err(e) = engine.drain().await {
                tracing::error!(error = %e, "drain failed");
            }
        }
    }
    true
}

/// Drains every pending `SignalSlot` flag in fixed priority order, looping
/// until a full pass finds nothing left — a flag re-armed mid-drain by a
/// concurrent `set()` is picked up again rather than left until the next
/// wakeup.
async fn drain_signal_slot<P, C, W, L>(
    state: &SharedState,
    engine: &FailoverEngine<'_, P, C, L>,
    watchdog: &W,
    config: &Config,
    status_file: &StatusFile,
) where
    P: PrimaryProbe,
    C: PeerCoordinator,
    W: WatchdogTransport,
    L: WorkerLauncher,
{
    while drain_one_signal_slot(state, engine, watchdog, config, status_file).await {}
}

#[allow(clippy::too_many_arguments)]
pub async fn run<P, C, W, L>(
    state: &SharedState,
    registry: &WorkerRegistry<L>,
    probe: &P,
    peer: &C,
    watchdog: &W,
    config: &Config,
    sockets: BoundSockets,
    status_file: &StatusFile,
) -> Result<i32>
where
    P: PrimaryProbe,
    C: PeerCoordinator,
    W: WatchdogTransport,
    L: WorkerLauncher,
{
    let mut router = SignalRouter::new()?;
    let engine = FailoverEngine::new(state, registry, probe, peer, config, status_file);

    loop {
        match router.next().await {
            RouterEvent::Shutdown(signal) => {
                lifecycle::shutdown(state, registry, sockets, config, status_file, signal).await?;
                return Ok(0);
            }
            RouterEvent::Wakeup => {
                if let Some(code) = reap(registry, state) {
                    return Ok(code);
                }
                drain_signal_slot(state, &engine, watchdog, config, status_file).await;
            }
            RouterEvent::Sigusr1 => {
                drain_signal_slot(state, &engine, watchdog, config, status_file).await;
            }
            RouterEvent::Sigchld => {
                if let Some(code) = reap(registry, state) {
                    return Ok(code);
                }
            }
            RouterEvent::ReloadConfig => {
                tracing::info!("SIGHUP received; config reload is not implemented, ignoring");
            }
            RouterEvent::Tick => {
                if let Some(code) = reap(registry, state) {
                    return Ok(code);
                }
                drain_signal_slot(state, &engine, watchdog, config, status_file).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "main_loop_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinated shutdown: every tracked child is signaled and reaped in a
//! fixed order, with the follow-primary child (its process group may still
//! be mid-promotion) and the log collector (the last consumer of anyone
//! else's output) held back to the end.

use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use pgsup_core::{Config, WorkerKind};
use pgsup_engine::{WorkerLauncher, WorkerRegistry};
use pgsup_state::{SharedState, StatusFile};

use crate::error::Result;
use crate::sockets::BoundSockets;

const REAP_POLL_INTERVAL: Duration = Duration::from_millis(50);
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

fn signal_kinds_except(state: &SharedState, exclude: &[WorkerKind], signal: Signal) -> usize {
    let workers = state.workers().read();
    workers
        .iter()
        .filter(|s| !exclude.contains(&s.kind))
        .filter_map(|s| s.pid)
        .filter(|&pid| kill(Pid::from_raw(pid as i32), signal).is_ok())
        .count()
}

fn any_running(state: &SharedState, kinds: &[WorkerKind]) -> bool {
    let workers = state.workers().read();
    workers.iter().filter(|s| kinds.contains(&s.kind)).any(|s| s.is_running())
}

/// Polls the reaper (never respawning — `switching_or_exiting = true`)
/// until every slot of `kinds` has cleared or `REAP_TIMEOUT` elapses.
async fn drain<L: WorkerLauncher>(registry: &WorkerRegistry<L>, state: &SharedState, kinds: &[WorkerKind]) {
    let deadline = tokio::time::Instant::now() + REAP_TIMEOUT;
    loop {
        if let Err(e) = registry.reap_exited(state, true) {
            tracing::warn!(error = %e, "reap failed during shutdown");
        }
        if !any_running(state, kinds) || tokio::time::Instant::now() >= deadline {
            return;
        }
        tokio::time::sleep(REAP_POLL_INTERVAL).await;
    }
}

fn remove_socket_file(path: &std::path::Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove socket file on shutdown");
        }
    }
}

/// Runs at most once: every caller serializes through `SharedState::exit()`,
/// so a second signal arriving mid-shutdown (or two signals racing on the
/// same tick) is a no-op rather than a second teardown stacked on the
/// first.
pub async fn shutdown<L: WorkerLauncher>(
    state: &SharedState,
    registry: &WorkerRegistry<L>,
    sockets: BoundSockets,
    config: &Config,
    status_file: &StatusFile,
    signal: Signal,
) -> Result<()> {
    {
        let mut guard = state.exit().lock();
        if guard.exiting {
            return Ok(());
        }
        guard.exiting = true;
    }

    tracing::info!(?signal, "shutting down");

    let statuses: Vec<_> = state
        .backends()
        .read()
        .iter()
        .map(|b| pgsup_state::persistence::PersistedStatus::from_backend_status(b.status))
        .collect();
    status_file.save(&statuses)?;

    let held_back = [WorkerKind::LogCollector, WorkerKind::FollowPrimary];
    let signaled = signal_kinds_except(state, &held_back, signal);
    tracing::info!(count = signaled, "signaled worker fleet");
    drain(registry, state, &held_back).await;

    let fp_signaled = registry.signal_kind(state, WorkerKind::FollowPrimary, signal);
    if fp_signaled > 0 {
        drain(registry, state, &[WorkerKind::LogCollector]).await;
    }

    let log_signaled = registry.signal_kind(state, WorkerKind::LogCollector, signal);
    if log_signaled > 0 {
        drain(registry, state, &[WorkerKind::LogCollector]).await;
    }

    drop(sockets);
    remove_socket_file(&config.client_socket_path());
    remove_socket_file(&config.pcp_socket_path());

    Ok(())
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;

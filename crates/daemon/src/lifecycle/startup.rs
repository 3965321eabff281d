// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: directories, the pid-file lock, status-file recovery,
//! the worker fleet, and the listening sockets, built in the order that
//! lets any failure bail out cleanly before anything observable (a bound
//! socket, a spawned child) exists.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use fs2::FileExt;
use pgsup_core::{BackendDescriptor, BackendStatus, Config, WorkerKind, WorkerSlot};
use pgsup_state::{SharedState, StatusFile};

use crate::collaborators::ProcessWorkerLauncher;
use crate::error::{DaemonError, Result};
use crate::sockets::{self, BoundSockets};

/// Held for the process lifetime; dropping it releases the exclusive lock
/// (`MAIN_EXIT_HANDLER_SEM`'s startup-time cousin — at most one supervisor
/// per `log_dir` may run).
pub struct StartupResult {
    pub state: SharedState,
    pub sockets: BoundSockets,
    pub registry: pgsup_engine::WorkerRegistry<ProcessWorkerLauncher>,
    pub status_file: StatusFile,
    #[allow(dead_code)]
    lock_file: File,
}

fn pid_lock_path(config: &Config) -> PathBuf {
    config.log_dir.join("pgsupd.pid")
}

/// Acquires the exclusive pid-file lock first, before anything else
/// touches disk: two supervisors racing to recover the same status file
/// or bind the same socket is a worse failure mode than one of them simply
/// refusing to start.
fn acquire_pid_lock(config: &Config) -> Result<File> {
    std::fs::create_dir_all(&config.log_dir)?;
    let path = pid_lock_path(config);
    let lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&path)?;
    lock_file.try_lock_exclusive().map_err(|_| DaemonError::LockHeld(path.clone()))?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

/// Restores backend status from the on-disk vector (or starts every
/// backend in `CONNECT_WAIT` on first boot or `--discard-status`).
fn load_backends(config: &Config, status_file: &StatusFile) -> Result<Vec<BackendDescriptor>> {
    if config.discard_status {
        status_file.discard()?;
    }
    let persisted = if config.discard_status { None } else { status_file.load()? };

    Ok(config
        .backends
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let mut descriptor = BackendDescriptor::new(i as i32, b.host.clone(), b.port, b.data_directory.clone());
            descriptor.flags = b.flags();
            descriptor.status = persisted
                .as_ref()
                .and_then(|v| v.get(i))
                .map(|p| p.into_backend_status())
                .unwrap_or(BackendStatus::ConnectWait);
            descriptor
        })
        .collect())
}

/// One slot per configured worker role, sized per spec.md §4.4: `M` query
/// workers, one each of PCP/generic/log-collector, a watchdog pair only
/// when `use_watchdog`, and one health-check worker per backend.
fn build_worker_slots(config: &Config) -> Vec<WorkerSlot> {
    let pool_depth = config.max_pool as usize * config.backend_count().max(1);
    let mut slots = Vec::new();
    for i in 0..config.num_init_children as usize {
        slots.push(WorkerSlot::new(WorkerKind::Query, i, pool_depth));
    }
    slots.push(WorkerSlot::new(WorkerKind::Pcp, 0, 0));
    slots.push(WorkerSlot::new(WorkerKind::Generic, 0, 0));
    slots.push(WorkerSlot::new(WorkerKind::LogCollector, 0, 0));
    if config.use_watchdog {
        slots.push(WorkerSlot::new(WorkerKind::Watchdog, 0, 0));
        slots.push(WorkerSlot::new(WorkerKind::WatchdogLifecheck, 0, 0));
    }
    for i in 0..config.backend_count() {
        slots.push(WorkerSlot::new(WorkerKind::HealthCheck, i, 0));
    }
    slots
}

pub async fn startup(config: &Config, exe: PathBuf, config_path: PathBuf) -> Result<StartupResult> {
    let lock_file = acquire_pid_lock(config)?;

    std::fs::create_dir_all(&config.socket_dir)?;
    std::fs::create_dir_all(&config.pcp_socket_dir)?;
    if let Some(parent) = config.status_file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let status_file = StatusFile::new(&config.status_file_path);
    let backends = load_backends(config, &status_file)?;

    let state = SharedState::new(backends, build_worker_slots(config), queue_capacity(config));

    let sockets = sockets::bind_all(config).await?;

    let launcher = ProcessWorkerLauncher::new(exe, config_path);
    let registry = pgsup_engine::WorkerRegistry::new(launcher);
    registry.spawn_all(&state)?;

    persist_current_status(&state, &status_file)?;

    Ok(StartupResult { state, sockets, registry, status_file, lock_file })
}

/// `Q`: sized generously relative to the worker fleet so a burst of
/// simultaneous `NODE_DOWN` requests from every health-check worker can't
/// realistically fill it before the Failover Engine drains it.
fn queue_capacity(config: &Config) -> usize {
    (config.backend_count() * 4).max(16)
}

/// Writes the just-loaded vector back out immediately so a crash between
/// startup and the first state-changing transition still leaves a status
/// file reflecting what this boot actually saw, not a stale one from
/// before the crash that preceded it.
fn persist_current_status(state: &SharedState, status_file: &StatusFile) -> Result<()> {
    let statuses: Vec<_> = state
        .backends()
        .read()
        .iter()
        .map(|b| pgsup_state::persistence::PersistedStatus::from_backend_status(b.status))
        .collect();
    status_file.save(&statuses)?;
    Ok(())
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;

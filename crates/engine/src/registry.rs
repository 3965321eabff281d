// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker Registry: fork policy and the SIGCHLD reaper.
//!
//! A classic fork(2)-without-exec body (block signals, fork, child resets
//! handlers and enters its own main) cannot safely continue inside a
//! process that has already initialized a tokio runtime. The fork/exec
//! equivalent — spawn a fresh OS process running the appropriate worker
//! role — gets the same process-tree supervision properties without that
//! hazard; [`WorkerLauncher`] is the seam where that happens, left external
//! because the worker bodies themselves are out of scope here.

use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use pgsup_core::{now_ms, WorkerKind, WorkerSlot};
use pgsup_state::SharedState;

use crate::error::{EngineError, Result};

/// Worker exit code meaning "terminate the supervisor with this code."
pub const FATAL_EXIT_CODE: i32 = 1;
/// Worker exit code meaning "clear the slot, do not respawn."
pub const NO_RESTART_EXIT_CODE: i32 = 2;

/// Spawns one OS process for a worker slot. Implementations own the actual
/// exec target (query worker, PCP worker, health-check probe, ...); this
/// crate only tracks the resulting pid and lifecycle.
pub trait WorkerLauncher: Send + Sync + 'static {
    fn spawn(&self, kind: WorkerKind, slot: usize) -> std::io::Result<u32>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    Normal,
    Fatal(i32),
    NoRestart,
    Signaled(i32),
    Other(i32),
}

/// Classifies a reaped child's exit. Returns `None` for statuses that do
/// not represent a terminated child (`Stopped`, `Continued`, ...) — the
/// reaper ignores those and keeps draining.
pub fn classify(status: WaitStatus) -> Option<(Pid, ExitClass)> {
    match status {
        WaitStatus::Exited(pid, FATAL_EXIT_CODE) => Some((pid, ExitClass::Fatal(FATAL_EXIT_CODE))),
        WaitStatus::Exited(pid, NO_RESTART_EXIT_CODE) => Some((pid, ExitClass::NoRestart)),
        WaitStatus::Exited(pid, 0) => Some((pid, ExitClass::Normal)),
        WaitStatus::Exited(pid, code) => Some((pid, ExitClass::Other(code))),
        WaitStatus::Signaled(pid, signal, _) => Some((pid, ExitClass::Signaled(signal as i32))),
        _ => None,
    }
}

pub struct WorkerRegistry<L> {
    launcher: L,
}

impl<L: WorkerLauncher> WorkerRegistry<L> {
    pub fn new(launcher: L) -> Self {
        Self { launcher }
    }

    /// Forks the initial fleet. Fork failure is fatal.
    pub fn spawn_all(&self, state: &SharedState) -> Result<()> {
        let mut workers = state.workers().write();
        for slot in workers.iter_mut() {
            let pid = self.launcher.spawn(slot.kind, slot.slot)?;
            slot.pid = Some(pid);
            slot.started_at_ms = now_ms();
            slot.need_restart = false;
        }
        Ok(())
    }

    fn respawn_slot(&self, slot: &mut WorkerSlot) -> Result<()> {
        let pid = self.launcher.spawn(slot.kind, slot.slot)?;
        slot.pid = Some(pid);
        slot.started_at_ms = now_ms();
        slot.need_restart = false;
        Ok(())
    }

    /// Drains exited children non-blockingly, acting on each per the
    /// classification rules below. Stops and returns
    /// `EngineError::ChildFatal` on the first `FATAL` exit; the caller is
    /// expected to terminate the supervisor with that code.
    pub fn reap_exited(&self, state: &SharedState, switching_or_exiting: bool) -> Result<usize> {
        let mut reaped = 0;
        loop {
            let status = match waitpid(None::<Pid>, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => break,
                Ok(status) => status,
                Err(nix::errno::Errno::ECHILD) => break,
                Err(e) => return Err(EngineError::ForkFailed(std::io::Error::from(e))),
            };
            let Some((pid, class)) = classify(status) else { continue };
            reaped += 1;

            if let ExitClass::Fatal(code) = class {
                return Err(EngineError::ChildFatal(code));
            }
            if let ExitClass::Signaled(sig) = class {
                if sig == Signal::SIGSEGV as i32 || sig == Signal::SIGKILL as i32 {
                    tracing::warn!(pid = pid.as_raw(), sig, "child terminated by signal");
                } else {
                    tracing::info!(pid = pid.as_raw(), sig, "child terminated by signal");
                }
            }

            let mut workers = state.workers().write();
            let Some(slot) = workers.iter_mut().find(|s| s.pid == Some(pid.as_raw() as u32)) else {
                continue;
            };
            slot.pid = None;

            if matches!(class, ExitClass::NoRestart) {
                continue;
            }
            if !slot.kind.respawns_by_default() {
                continue;
            }
            if switching_or_exiting {
                slot.need_restart = true;
                continue;
            }
            let kind = slot.kind;
            if let Err(e) = self.respawn_slot(slot) {
                tracing::error!(error = %e, kind = ?kind, "failed to respawn worker");
            } else if matches!(kind, WorkerKind::Watchdog) {
                tracing::info!("watchdog child respawned, recovering peer state");
            }
        }
        Ok(reaped)
    }

    /// Signals every tracked child except the log collector, which the
    /// caller signals last during shutdown.
    pub fn signal_all_except_log_collector(&self, state: &SharedState, signal: Signal) -> usize {
        let workers = state.workers().read();
        workers
            .iter()
            .filter(|s| !matches!(s.kind, WorkerKind::LogCollector))
            .filter_map(|s| s.pid)
            .filter(|&pid| kill(Pid::from_raw(pid as i32), signal).is_ok())
            .count()
    }

    /// Signals every slot of `kind` (e.g. `SIGUSR1` to every query worker
    /// for `CLOSE_IDLE`).
    pub fn signal_kind(&self, state: &SharedState, kind: WorkerKind, signal: Signal) -> usize {
        let workers = state.workers().read();
        workers
            .iter()
            .filter(|s| s.kind == kind)
            .filter_map(|s| s.pid)
            .filter(|&pid| kill(Pid::from_raw(pid as i32), signal).is_ok())
            .count()
    }

    /// Signals every slot of `kind`, waits for it to exit, and spawns a
    /// replacement. Used to restart the PCP worker after a processed
    /// request is processed.
    pub fn restart_slot_kind(&self, state: &SharedState, kind: WorkerKind) -> Result<()> {
        let pids: Vec<u32> = {
            let workers = state.workers().read();
            workers.iter().filter(|s| s.kind == kind).filter_map(|s| s.pid).collect()
        };
        for pid in &pids {
            let _ = kill(Pid::from_raw(*pid as i32), Signal::SIGTERM);
        }
        for pid in &pids {
            let _ = waitpid(Pid::from_raw(*pid as i32), None);
        }
        let mut workers = state.workers().write();
        for slot in workers.iter_mut().filter(|s| s.kind == kind) {
            self.respawn_slot(slot)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

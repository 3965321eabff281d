// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal Router: the async-runtime equivalent of the self-pipe trick.
//!
//! A handler that only sets a flag, writes one byte to a pipe, and restores
//! errno has no async analogue to "restore errno" — there is no signal
//! context to escape, `tokio::signal::unix::signal` already does the
//! pipe-and-wake dance for us. What carries over is the *discipline*: the
//! main loop never acts on a signal directly inline, it wakes up, looks at
//! what is pending, and acts in one fixed priority order so a burst of
//! simultaneous signals is still processed deterministically.

use nix::sys::signal::Signal;
use tokio::signal::unix::{signal, Signal as UnixSignal, SignalKind};
use tokio::time::{interval, Interval};

use crate::error::Result;

/// What the main loop should act on next, in the fixed order `next()`
/// enforces: shutdown pre-empts everything else, then `wakeup_request`,
/// then `sigusr1_request`, then `sigchld_request`, then
/// `reload_config_request`. A periodic tick is folded in as the lowest
/// priority so the main loop still makes forward progress (status-file
/// consistency checks, etc.) when nothing signals it for a while.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterEvent {
    Shutdown(Signal),
    Wakeup,
    Sigusr1,
    Sigchld,
    ReloadConfig,
    Tick,
}

#[derive(Debug, Default)]
struct PendingFlags {
    shutdown: Option<Signal>,
    wakeup: bool,
    sigusr1: bool,
    sigchld: bool,
    reload_config: bool,
}

impl PendingFlags {
    /// Pops the highest-priority pending flag, clearing it. `None` means
    /// every flag was clear and the caller should go back to waiting.
    fn take_next(&mut self) -> Option<RouterEvent> {
        if let Some(sig) = self.shutdown.take() {
            return Some(RouterEvent::Shutdown(sig));
        }
        if std::mem::take(&mut self.wakeup) {
            return Some(RouterEvent::Wakeup);
        }
        if std::mem::take(&mut self.sigusr1) {
            return Some(RouterEvent::Sigusr1);
        }
        if std::mem::take(&mut self.sigchld) {
            return Some(RouterEvent::Sigchld);
        }
        if std::mem::take(&mut self.reload_config) {
            return Some(RouterEvent::ReloadConfig);
        }
        None
    }
}

/// Owns one `tokio::signal::unix::Signal` stream per signal the supervisor
/// consumes (spec.md's "signals consumed" table, minus `SIGPIPE`, which
/// this process never receives meaningfully once its pipes are owned by
/// `tokio`) plus the 3-second periodic tick that replaces the self-pipe
/// `select`'s timeout.
pub struct SignalRouter {
    sigusr1: UnixSignal,
    sigusr2: UnixSignal,
    sigchld: UnixSignal,
    sighup: UnixSignal,
    sigterm: UnixSignal,
    sigint: UnixSignal,
    sigquit: UnixSignal,
    tick: Interval,
    pending: PendingFlags,
}

impl SignalRouter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            sigusr1: signal(SignalKind::user_defined1())?,
            sigusr2: signal(SignalKind::user_defined2())?,
            sigchld: signal(SignalKind::child())?,
            sighup: signal(SignalKind::hangup())?,
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
            sigquit: signal(SignalKind::quit())?,
            tick: interval(std::time::Duration::from_secs(3)),
            pending: PendingFlags::default(),
        })
    }

    /// Waits for the next event to act on, draining every signal that
    /// arrived in the meantime into `pending` and returning them in fixed
    /// priority order before waiting again. A caller that keeps calling
    /// `next()` in a loop sees exactly the "loop until `sigusr1_request`
    /// stays 0 for one full pass" behavior: a `Sigusr1` returned here may
    /// be followed immediately by another `Sigusr1` on the very next call
    /// if the signal re-armed while the first was being handled.
    pub async fn next(&mut self) -> RouterEvent {
        loop {
            if let Some(event) = self.pending.take_next() {
                return event;
            }
            tokio::select! {
                biased;
                _ = self.sigterm.recv() => self.pending.shutdown = Some(Signal::SIGTERM),
                _ = self.sigint.recv() => self.pending.shutdown = Some(Signal::SIGINT),
                _ = self.sigquit.recv() => self.pending.shutdown = Some(Signal::SIGQUIT),
                _ = self.sigusr2.recv() => self.pending.wakeup = true,
                _ = self.sigusr1.recv() => self.pending.sigusr1 = true,
                _ = self.sigchld.recv() => self.pending.sigchld = true,
                _ = self.sighup.recv() => self.pending.reload_config = true,
                _ = self.tick.tick() => return RouterEvent::Tick,
            }
        }
    }
}

#[cfg(test)]
#[path = "signal_router_tests.rs"]
mod tests;

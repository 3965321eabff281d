// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-level error taxonomy. Every variant here is one `main_loop`
//! decides is fatal at startup, or logs and continues past once running —
//! see `main_loop::run` for which is which.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] pgsup_core::Error),

    #[error("failed to acquire exclusive lock on pid file {0}: already running?")]
    LockHeld(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind {0}: {1}")]
    BindFailed(String, std::io::Error),

    #[error(transparent)]
    State(#[from] pgsup_state::StateError),

    #[error(transparent)]
    Engine(#[from] pgsup_engine::EngineError),

    #[error("child process reported a fatal exit code {0}")]
    ChildFatal(i32),
}

pub type Result<T> = std::result::Result<T, DaemonError>;

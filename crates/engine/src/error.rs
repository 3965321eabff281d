// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("node id {0} out of range")]
    NodeIdOutOfRange(i32),

    #[error("request rejected: {0}")]
    RequestRejected(String),

    #[error(transparent)]
    State(#[from] pgsup_state::StateError),

    #[error("child process reported a fatal exit code {0}")]
    ChildFatal(i32),

    #[error("fork failed: {0}")]
    ForkFailed(#[from] std::io::Error),

    #[error(transparent)]
    Wire(#[from] pgsup_wire::ProtocolError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

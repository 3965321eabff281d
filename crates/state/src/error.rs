// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("request queue is full")]
    QueueFull,

    #[error("node id {0} out of range")]
    NodeIdOutOfRange(i32),

    #[error("status file io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("status file content is malformed: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, StateError>;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every layer. Whether a given
//! variant is fatal is a property of where it is handled
//! (`pgsup-daemon::main_loop`), not of the variant itself.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error("resource exhausted at startup: {0}")]
    ResourceExhausted(String),

    #[error("node id {0} out of range")]
    NodeIdOutOfRange(i32),

    #[error("status file io error: {0}")]
    StatusFileIo(#[from] std::io::Error),

    #[error("status file content is malformed: {0}")]
    StatusFileMalformed(String),

    #[error("request queue is full")]
    QueueFull,

    #[error("child process reported a fatal exit code {0}")]
    ChildFatal(i32),

    #[error("shared-memory region corrupted: {0}")]
    SharedStateCorrupt(String),
}

pub type Result<T> = std::result::Result<T, Error>;

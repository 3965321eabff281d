// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-recoverable backend-status file.
//!
//! One line per backend: `up`, `down`, or `unused`. A legacy build wrote a
//! raw byte per backend (`'U'`/`'D'`/`'N'` as the single character on the
//! line rather than the full word) — both are accepted on read, only the
//! current text format is ever written.

use crate::error::{Result, StateError};
use pgsup_core::BackendStatus;
use std::io::Write;

/// One backend's on-disk status token. Narrower than [`BackendStatus`]:
/// `ConnectWait` and `Up` both persist as `up`, since a loaded-as-up
/// backend is re-validated by the Primary Finder before the supervisor
/// trusts it as fully `Up` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistedStatus {
    Up,
    Down,
    Unused,
}

impl PersistedStatus {
    fn to_token(self) -> &'static str {
        match self {
            PersistedStatus::Up => "up",
            PersistedStatus::Down => "down",
            PersistedStatus::Unused => "unused",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "up" | "U" => Some(PersistedStatus::Up),
            "down" | "D" => Some(PersistedStatus::Down),
            "unused" | "N" => Some(PersistedStatus::Unused),
            _ => None,
        }
    }

    /// How a freshly loaded status maps into the live in-memory state: an
    /// on-disk `up` is loaded as `ConnectWait` pending re-validation, never
    /// straight to `Up` (round-trip law: restart restores the
    /// last written vector, but liveness is never assumed without a probe).
    pub fn into_backend_status(self) -> BackendStatus {
        match self {
            PersistedStatus::Up => BackendStatus::ConnectWait,
            PersistedStatus::Down => BackendStatus::Down,
            PersistedStatus::Unused => BackendStatus::Unused,
        }
    }

    pub fn from_backend_status(status: BackendStatus) -> Self {
        match status {
            BackendStatus::Up | BackendStatus::ConnectWait => PersistedStatus::Up,
            BackendStatus::Down => PersistedStatus::Down,
            BackendStatus::Unused => PersistedStatus::Unused,
        }
    }
}

pub struct StatusFile {
    path: std::path::PathBuf,
}

impl StatusFile {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Loads the persisted vector, or `None` if the file does not exist
    /// (first startup). A bogus file — one with no `up` entries at all
    /// among otherwise-parseable lines — coerces every backend to
    /// `CONNECT_WAIT` rather than trusting the literal read.
    pub fn load(&self) -> Result<Option<Vec<PersistedStatus>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)?;
        let mut statuses = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let token = line.trim();
            if token.is_empty() {
                continue;
            }
            let status = PersistedStatus::from_token(token).ok_or_else(|| {
                StateError::Malformed(format!("line {}: unrecognized token {token:?}", lineno + 1))
            })?;
            statuses.push(status);
        }
        if statuses.is_empty() {
            return Err(StateError::Malformed("status file has no entries".into()));
        }
        if !statuses.iter().any(|s| matches!(s, PersistedStatus::Up)) {
            // Bogus file: no backend ever came up. Coerce every entry to
            // CONNECT_WAIT so the supervisor re-probes instead of trusting
            // a file that likely predates any successful connection.
            return Ok(Some(vec![PersistedStatus::Up; statuses.len()]));
        }
        Ok(Some(statuses))
    }

    /// Writes the vector, `fsync`ing before close. If every entry is `down`,
    /// the write is skipped entirely so a prior, more informative vector
    /// survives an ambiguous restart.
    pub fn save(&self, statuses: &[PersistedStatus]) -> Result<()> {
        if statuses.iter().all(|s| matches!(s, PersistedStatus::Down)) {
            return Ok(());
        }
        let mut text = String::with_capacity(statuses.len() * 6);
        for status in statuses {
            text.push_str(status.to_token());
            text.push('\n');
        }
        let mut file = std::fs::File::create(&self.path)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// `discard_status`: remove the file so every backend starts in
    /// `CONNECT_WAIT`.
    pub fn discard(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "persistence_tests.rs"]
mod tests;

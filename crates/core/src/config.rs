// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor configuration. Loaded from TOML; the two startup booleans
//! are also settable from CLI flags in `pgsup-daemon`, which override the
//! file.

use crate::backend::BackendFlags;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Static per-backend configuration (the parts that do not change at
/// runtime — contrast with `BackendDescriptor`, which also tracks live
/// status).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
    pub data_directory: String,
    #[serde(default)]
    pub always_primary: bool,
    #[serde(default)]
    pub disallow_to_failover: bool,
}

impl BackendConfig {
    pub fn flags(&self) -> BackendFlags {
        BackendFlags {
            always_primary: self.always_primary,
            disallow_to_failover: self.disallow_to_failover,
        }
    }
}

fn default_listen_backlog_multiplier() -> u32 {
    2
}

fn default_max_listen_backlog() -> u32 {
    10000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backends: Vec<BackendConfig>,

    /// M: count of query workers.
    pub num_init_children: u32,
    /// P: per-worker connection pool depth.
    pub max_pool: u32,

    pub port: u16,
    pub pcp_port: u16,
    #[serde(default)]
    pub listen_addresses: Vec<String>,
    pub socket_dir: PathBuf,
    pub pcp_socket_dir: PathBuf,

    #[serde(default = "default_listen_backlog_multiplier")]
    pub listen_backlog_multiplier: u32,
    #[serde(default = "default_max_listen_backlog")]
    pub max_listen_backlog: u32,

    #[serde(default)]
    pub detach_false_primary: bool,
    #[serde(default)]
    pub failover_command: Option<String>,
    #[serde(default)]
    pub failback_command: Option<String>,
    #[serde(default)]
    pub follow_primary_command: Option<String>,
    /// Seconds; 0 = infinite.
    #[serde(default)]
    pub search_primary_node_timeout: u64,

    #[serde(default)]
    pub use_watchdog: bool,
    /// `host:port` of every peer supervisor; consulted only when
    /// `use_watchdog` is set. Empty means this node runs without peers.
    #[serde(default)]
    pub watchdog_peers: Vec<String>,
    #[serde(default)]
    pub memory_cache_enabled: bool,
    #[serde(default)]
    pub enable_shared_relcache: bool,

    /// Shell template run once per backend per probe round, expected to
    /// print `in_recovery`/`not_in_recovery` on the first line, the server
    /// version as `MAJOR.MINOR.PATCH` on the second, and (for a standby
    /// only) `streaming <host> <port>` or `not_streaming` on the third.
    /// Connecting to the real wire protocol is out of scope here; this is
    /// the seam an operator points at an actual probe script.
    #[serde(default)]
    pub primary_probe_command: Option<String>,

    /// Streaming-replication topology (exactly one writable backend) vs.
    /// every backend independently writable.
    #[serde(default = "default_true")]
    pub streaming_replication_mode: bool,

    pub log_dir: PathBuf,
    pub status_file_path: PathBuf,

    /// Wiped and all backends start `CONNECT_WAIT`; set via CLI flag, not
    /// persisted in the config file.
    #[serde(skip, default)]
    pub discard_status: bool,
    /// Wipe query-cache OID maps at startup; consumed here only to be
    /// threaded through to the (external) query-cache collaborator.
    #[serde(skip, default)]
    pub clear_memcache_oidmaps: bool,
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| Error::ConfigInvalid(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backends.is_empty() {
            return Err(Error::ConfigInvalid("at least one backend is required".into()));
        }
        if self.num_init_children == 0 {
            return Err(Error::ConfigInvalid("num_init_children must be > 0".into()));
        }
        Ok(())
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Listen backlog: `num_init_children *
    /// listen_backlog_multiplier`, capped at `max_listen_backlog`.
    pub fn listen_backlog(&self) -> u32 {
        (self.num_init_children * self.listen_backlog_multiplier).min(self.max_listen_backlog)
    }

    pub fn client_socket_path(&self) -> PathBuf {
        self.socket_dir.join(format!(".s.PGSQL.{}", self.port))
    }

    pub fn pcp_socket_path(&self) -> PathBuf {
        self.pcp_socket_dir.join(format!(".s.PGSQL.{}", self.pcp_port))
    }

    crate::setters! {
        set { discard_status: bool }
        set { clear_memcache_oidmaps: bool }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pgsupd` CLI surface and the merge of its flags onto the TOML-loaded
//! `Config`.

use std::path::PathBuf;

use clap::Parser;
use pgsup_core::Config;

use crate::error::Result;

#[derive(Debug, Parser)]
#[command(name = "pgsupd", author, version, about = "Connection pooling and failover supervisor")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    pub config: PathBuf,

    /// Wipe persisted backend status; every backend starts in CONNECT_WAIT.
    #[arg(long)]
    pub discard_status: bool,

    /// Wipe query-cache OID maps at startup.
    #[arg(long)]
    pub clear_memcache_oidmaps: bool,

    /// Overrides the config file's log directory.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Kept for operator muscle memory; this rewrite never double-forks,
    /// so there is no background mode to skip.
    #[arg(short = 'n', long = "foreground")]
    pub foreground: bool,
}

impl Cli {
    /// Loads the config file named by `--config` and applies every CLI
    /// override. CLI flags win over the file; the file wins over defaults.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(&self.config)?;
        config = config.discard_status(self.discard_status).clear_memcache_oidmaps(self.clear_memcache_oidmaps);
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = log_dir.clone();
        }
        Ok(config)
    }
}

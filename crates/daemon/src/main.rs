// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pgsupd` entry point.
//!
//! Every process that runs this binary starts here, including the forked
//! worker fleet: [`collaborators::WORKER_KIND_ENV`] is checked first, and a
//! process that sees it set never reaches supervisor startup — it runs the
//! worker stub instead. The query/PCP/health-check/watchdog worker bodies
//! themselves are external collaborators (spec.md §1); the stub only gives
//! the reaper something real to fork, signal, and reap end to end.

use clap::Parser;
use pgsup_daemon::collaborators::{worker_kind_from_token, WORKER_KIND_ENV, WORKER_SLOT_ENV};
use pgsup_daemon::{collaborators, lifecycle, main_loop, Cli};
use tracing_subscriber::{filter::EnvFilter, prelude::*};

#[tokio::main]
async fn main() {
    if let Ok(kind_token) = std::env::var(WORKER_KIND_ENV) {
        run_worker_stub(&kind_token).await;
        return;
    }

    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config.log_dir);

    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => {
            tracing::error!(error = %e, "failed to resolve own executable path");
            std::process::exit(1);
        }
    };

    let startup = match lifecycle::startup(&config, exe, cli.config.clone()).await {
        Ok(startup) => startup,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            std::process::exit(1);
        }
    };

    let probe = collaborators::CommandProbe::new(
        config.primary_probe_command.clone().unwrap_or_else(|| "true".to_string()),
    );
    let peers = resolve_watchdog_peers(&config);
    let peer = collaborators::TcpPeerCoordinator::new(peers.clone());
    let watchdog = collaborators::TcpWatchdogTransport::new(peers);

    let code = match main_loop::run(
        &startup.state,
        &startup.registry,
        &probe,
        &peer,
        &watchdog,
        &config,
        startup.sockets,
        &startup.status_file,
    )
    .await
    {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "supervisor main loop exited with an error");
            1
        }
    };
    std::process::exit(code);
}

fn resolve_watchdog_peers(config: &pgsup_core::Config) -> Vec<std::net::SocketAddr> {
    if !config.use_watchdog {
        return Vec::new();
    }
    config
        .watchdog_peers
        .iter()
        .filter_map(|peer| match peer.parse() {
            Ok(addr) => Some(addr),
            Err(e) => {
                tracing::warn!(peer, error = %e, "ignoring unparseable watchdog peer address");
                None
            }
        })
        .collect()
}

/// Tees logs to stdout and to `<log_dir>/pgsupd.log`, non-blocking so a
/// slow disk never stalls the main loop (the same reasoning the original
/// gave for running a dedicated log collector process, adapted to a single
/// in-process subscriber).
fn init_logging(log_dir: &std::path::Path) {
    let _ = std::fs::create_dir_all(log_dir);
    let file_appender = tracing_appender::rolling::daily(log_dir, "pgsupd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Leaked intentionally: the guard must outlive every subsequent log
    // call for the rest of the process, and this runs exactly once at
    // startup before any worker fork.
    std::mem::forget(guard);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_ansi(true))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();
}

/// Minimal worker body: installs the default disposition the fork policy
/// promises (`§4.4`: "the child ... installs default signal disposition")
/// and parks until terminated. Real query/PCP/health-check bodies are out
/// of scope (spec.md §1); this is the seam an operator replaces per role.
async fn run_worker_stub(kind_token: &str) {
    let Some(kind) = worker_kind_from_token(kind_token) else {
        eprintln!("unrecognized {WORKER_KIND_ENV} value: {kind_token}");
        std::process::exit(1);
    };
    let slot = std::env::var(WORKER_SLOT_ENV).ok().and_then(|s| s.parse::<usize>().ok()).unwrap_or(0);

    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(sig) => sig,
        Err(e) => {
            eprintln!("failed to install SIGTERM handler in worker stub: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(?kind, slot, "worker stub started");
    sigterm.recv().await;
    tracing::info!(?kind, slot, "worker stub exiting on SIGTERM");
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concrete implementations of the engine's external-collaborator traits.
//!
//! `pgsup-engine` only owns the classification and resolution rules for
//! probing a backend, forking a worker, and talking to a peer supervisor;
//! this module is where those rules meet an actual OS process, an actual
//! shell probe, and an actual TCP socket.

use std::net::SocketAddr;
use std::path::PathBuf;

use async_trait::async_trait;
use pgsup_core::{BackendDescriptor, WorkerKind};
use pgsup_engine::{
    PeerCoordinator, PrimaryProbe, ProbeError, ServerVersion, WalReceiverStatus, WatchdogTransport, WorkerLauncher,
};
use pgsup_wire::{read_message, write_message, ProtocolError, WatchdogMessage, WatchdogStatusVector};
use tokio::net::TcpStream;

/// Environment variables a re-exec'd child reads to learn which worker
/// role to run. Set by [`ProcessWorkerLauncher::spawn`], read by
/// `pgsup-daemon::main` before it does anything else — a child that sees
/// these never reaches the supervisor startup path.
pub const WORKER_KIND_ENV: &str = "PGSUP_WORKER_KIND";
pub const WORKER_SLOT_ENV: &str = "PGSUP_WORKER_SLOT";

fn worker_kind_token(kind: WorkerKind) -> &'static str {
    match kind {
        WorkerKind::Query => "query",
        WorkerKind::Pcp => "pcp",
        WorkerKind::Generic => "generic",
        WorkerKind::LogCollector => "log_collector",
        WorkerKind::Watchdog => "watchdog",
        WorkerKind::WatchdogLifecheck => "watchdog_lifecheck",
        WorkerKind::HealthCheck => "health_check",
        WorkerKind::FollowPrimary => "follow_primary",
    }
}

pub fn worker_kind_from_token(token: &str) -> Option<WorkerKind> {
    Some(match token {
        "query" => WorkerKind::Query,
        "pcp" => WorkerKind::Pcp,
        "generic" => WorkerKind::Generic,
        "log_collector" => WorkerKind::LogCollector,
        "watchdog" => WorkerKind::Watchdog,
        "watchdog_lifecheck" => WorkerKind::WatchdogLifecheck,
        "health_check" => WorkerKind::HealthCheck,
        "follow_primary" => WorkerKind::FollowPrimary,
        _ => return None,
    })
}

/// Spawns worker roles by re-exec'ing the current binary with
/// `PGSUP_WORKER_KIND`/`PGSUP_WORKER_SLOT` set. A classic
/// fork(2)-without-exec body cannot safely run inside a process that has
/// already initialized a tokio runtime; re-exec gets the same
/// process-tree supervision properties without that hazard.
pub struct ProcessWorkerLauncher {
    exe: PathBuf,
    config_path: PathBuf,
}

impl ProcessWorkerLauncher {
    pub fn new(exe: PathBuf, config_path: PathBuf) -> Self {
        Self { exe, config_path }
    }
}

impl WorkerLauncher for ProcessWorkerLauncher {
    fn spawn(&self, kind: WorkerKind, slot: usize) -> std::io::Result<u32> {
        let child = std::process::Command::new(&self.exe)
            .arg("--config")
            .arg(&self.config_path)
            .env(WORKER_KIND_ENV, worker_kind_token(kind))
            .env(WORKER_SLOT_ENV, slot.to_string())
            .spawn()?;
        Ok(child.id())
    }
}

/// Runs `primary_probe_command` (see `Config::primary_probe_command`)
/// against a backend and parses its fixed three-line stdout contract.
/// Connecting to the real wire protocol and issuing
/// `pg_is_in_recovery()`/`pg_stat_wal_receiver` queries directly is out of
/// scope; this is the seam an operator wires a real probe script into.
pub struct CommandProbe {
    template: String,
}

impl CommandProbe {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    async fn run(&self, backend: &BackendDescriptor) -> Result<String, ProbeError> {
        let command = self
            .template
            .replace("%h", &backend.host)
            .replace("%p", &backend.port.to_string())
            .replace("%d", &backend.id.to_string());
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&command)
            .output()
            .await
            .map_err(|e| ProbeError::ConnectionFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(ProbeError::ConnectionFailed(format!("exit code {:?}", output.status.code())));
        }
        String::from_utf8(output.stdout).map_err(|e| ProbeError::ConnectionFailed(e.to_string()))
    }
}

#[async_trait]
impl PrimaryProbe for CommandProbe {
    async fn is_in_recovery(&self, backend: &BackendDescriptor) -> Result<bool, ProbeError> {
        let stdout = self.run(backend).await?;
        match stdout.lines().next().map(str::trim) {
            Some("in_recovery") => Ok(true),
            Some("not_in_recovery") => Ok(false),
            other => Err(ProbeError::ConnectionFailed(format!("unrecognized recovery line: {other:?}"))),
        }
    }

    async fn server_version(&self, backend: &BackendDescriptor) -> Result<ServerVersion, ProbeError> {
        let stdout = self.run(backend).await?;
        let line = stdout.lines().nth(1).ok_or_else(|| ProbeError::ConnectionFailed("missing version line".into()))?;
        let mut parts = line.trim().splitn(3, '.');
        let parse = |p: Option<&str>| -> Option<u32> { p?.parse().ok() };
        let major = parse(parts.next());
        let minor = parse(parts.next());
        let patch = parse(parts.next());
        match (major, minor, patch) {
            (Some(a), Some(b), Some(c)) => Ok(ServerVersion(a, b, c)),
            _ => Err(ProbeError::ConnectionFailed(format!("unparseable version line: {line:?}"))),
        }
    }

    async fn wal_receiver_status(
        &self,
        backend: &BackendDescriptor,
    ) -> Result<Option<WalReceiverStatus>, ProbeError> {
        let stdout = self.run(backend).await?;
        let line = stdout.lines().nth(2).unwrap_or("not_streaming").trim().to_string();
        if line == "not_streaming" {
            return Ok(None);
        }
        let mut parts = line.splitn(3, ' ');
        let tag = parts.next();
        let host = parts.next();
        let port = parts.next().and_then(|p| p.parse::<u16>().ok());
        match (tag, host, port) {
            (Some("streaming"), Some(host), Some(port)) => {
                Ok(Some(WalReceiverStatus { streaming: true, sender_host: host.to_string(), sender_port: port }))
            }
            _ => Err(ProbeError::ConnectionFailed(format!("unparseable wal-receiver line: {line:?}"))),
        }
    }
}

/// Broadcasts `WatchdogMessage`s to every configured peer over a fresh TCP
/// connection per call. No retry or connection pooling: a peer that is
/// unreachable this round is simply skipped, same as the failover engine
/// treating a broadcast failure as non-fatal.
pub struct TcpPeerCoordinator {
    peers: Vec<SocketAddr>,
}

impl TcpPeerCoordinator {
    pub fn new(peers: Vec<SocketAddr>) -> Self {
        Self { peers }
    }
}

#[async_trait]
impl PeerCoordinator for TcpPeerCoordinator {
    async fn broadcast(&self, message: WatchdogMessage) -> Result<(), ProtocolError> {
        for peer in &self.peers {
            match TcpStream::connect(peer).await {
                Ok(mut stream) => {
                    if let Err(e) = write_message(&mut stream, &message).await {
                        tracing::warn!(peer = %peer, error = %e, "failed to broadcast to watchdog peer");
                    }
                }
                Err(e) => tracing::warn!(peer = %peer, error = %e, "watchdog peer unreachable"),
            }
        }
        Ok(())
    }
}

/// Fetches the authoritative status vector from the first reachable peer.
/// `reconcile()` itself decides what to do with the answer; this only owns
/// getting bytes off (and back onto) the wire.
pub struct TcpWatchdogTransport {
    peers: Vec<SocketAddr>,
}

impl TcpWatchdogTransport {
    pub fn new(peers: Vec<SocketAddr>) -> Self {
        Self { peers }
    }
}

#[async_trait]
impl WatchdogTransport for TcpWatchdogTransport {
    async fn fetch_leader_status(&self) -> Result<WatchdogStatusVector, ProtocolError> {
        let mut last_err = None;
        for peer in &self.peers {
            match TcpStream::connect(peer).await {
                Ok(mut stream) => {
                    let request = WatchdogMessage::QuorumChanged { quorum_held: true };
                    if let Err(e) = write_message(&mut stream, &request).await {
                        last_err = Some(e);
                        continue;
                    }
                    match read_message::<_, WatchdogMessage>(&mut stream).await {
                        Ok(WatchdogMessage::StatusReport(vector)) => return Ok(vector),
                        Ok(_) => {
                            last_err = Some(ProtocolError::Io(std::io::Error::new(
                                std::io::ErrorKind::InvalidData,
                                "peer replied with an unexpected message kind",
                            )));
                        }
                        Err(e) => last_err = Some(e),
                    }
                }
                Err(e) => last_err = Some(ProtocolError::Io(e)),
            }
        }
        Err(last_err.unwrap_or(ProtocolError::Io(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            "no watchdog peers configured",
        ))))
    }
}

#[cfg(test)]
#[path = "collaborators_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use pgsup_core::backend::NodeId;
use pgsup_core::signal_slot::SignalFlag;
use pgsup_core::test_support::sample_backends;
use pgsup_core::{BackendStatus, WorkerKind, WorkerSlot};
use pgsup_engine::{ProbeError, ServerVersion, WalReceiverStatus};
use pgsup_wire::{BackendStatusReport, PeerBackendStatus, ProtocolError, WatchdogMessage, WatchdogStatusVector};
use std::sync::atomic::{AtomicUsize, Ordering};

struct StubProbe;

#[async_trait]
impl PrimaryProbe for StubProbe {
    async fn is_in_recovery(&self, _backend: &pgsup_core::BackendDescriptor) -> Result<bool, ProbeError> {
        Ok(false)
    }
    async fn server_version(&self, _backend: &pgsup_core::BackendDescriptor) -> Result<ServerVersion, ProbeError> {
        Ok(ServerVersion { major: 16, minor: 0, patch: 0 })
    }
    async fn wal_receiver_status(
        &self,
        _backend: &pgsup_core::BackendDescriptor,
    ) -> Result<Option<WalReceiverStatus>, ProbeError> {
        Ok(None)
    }
}

#[derive(Default)]
struct CountingPeer {
    broadcasts: AtomicUsize,
}

#[async_trait]
impl PeerCoordinator for CountingPeer {
    async fn broadcast(&self, _message: WatchdogMessage) -> std::result::Result<(), ProtocolError> {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FixedWatchdog {
    vector: WatchdogStatusVector,
}

#[async_trait]
impl WatchdogTransport for FixedWatchdog {
    async fn fetch_leader_status(&self) -> std::result::Result<WatchdogStatusVector, ProtocolError> {
        Ok(self.vector.clone())
    }
}

struct FailingWatchdog;

#[async_trait]
impl WatchdogTransport for FailingWatchdog {
    async fn fetch_leader_status(&self) -> std::result::Result<WatchdogStatusVector, ProtocolError> {
        Err(ProtocolError::FrameTooLarge(0))
    }
}

fn test_config() -> Config {
    pgsup_core::config::test_only_minimal_config()
}

fn test_status_file(dir: &tempfile::TempDir) -> StatusFile {
    StatusFile::new(dir.path().join("pgpool_status"))
}

#[tokio::test]
async fn drain_one_signal_slot_returns_false_when_nothing_is_pending() {
    let state = SharedState::new(sample_backends(1), vec![], 16);
    let registry: WorkerRegistry<crate::collaborators::ProcessWorkerLauncher> = WorkerRegistry::new(
        crate::collaborators::ProcessWorkerLauncher::new("/bin/true".into(), "/dev/null".into()),
    );
    let probe = StubProbe;
    let peer = CountingPeer::default();
    let config = test_config();
    let dir = tempfile::tempdir().unwrap();
    let status_file = test_status_file(&dir);
    let engine = FailoverEngine::new(&state, &registry, &probe, &peer, &config, &status_file);
    let watchdog = FailingWatchdog;

    let acted = drain_one_signal_slot(&state, &engine, &watchdog, &config, &status_file).await;
    assert!(!acted);
}

#[tokio::test]
async fn inform_quarantine_nodes_flag_drains_into_node_down_requests() {
    let mut backends = sample_backends(2);
    backends[0].quarantined = true;
    backends[0].status = BackendStatus::Down;
    let state = SharedState::new(backends, vec![], 16);
    state.signals().lock().set(SignalFlag::InformQuarantineNodes);

    let registry: WorkerRegistry<crate::collaborators::ProcessWorkerLauncher> = WorkerRegistry::new(
        crate::collaborators::ProcessWorkerLauncher::new("/bin/true".into(), "/dev/null".into()),
    );
    let probe = StubProbe;
    let peer = CountingPeer::default();
    let config = test_config();
    let dir = tempfile::tempdir().unwrap();
    let status_file = test_status_file(&dir);
    let engine = FailoverEngine::new(&state, &registry, &probe, &peer, &config, &status_file);
    let watchdog = FailingWatchdog;

    let acted = drain_one_signal_slot(&state, &engine, &watchdog, &config, &status_file).await;
    assert!(acted);
    assert!(!state.signals().lock().is_set(SignalFlag::InformQuarantineNodes));
}

#[tokio::test]
async fn backend_sync_required_applies_reconcile_status_updates() {
    let backends = sample_backends(1);
    let node_id: NodeId = backends[0].id;
    let state = SharedState::new(backends, vec![], 16);
    state.request_info().lock().primary_node_id = node_id;

    let vector = WatchdogStatusVector {
        backends: vec![BackendStatusReport { node_id, status: PeerBackendStatus::Down }],
        primary_node_id: -1,
    };
    let watchdog = FixedWatchdog { vector };
    let config = test_config();
    let dir = tempfile::tempdir().unwrap();
    let status_file = test_status_file(&dir);

    reconcile_with_leader(&state, &watchdog, &config, &status_file).await;

    assert_eq!(state.backends().read()[0].status, BackendStatus::Down);
}

#[tokio::test]
async fn backend_sync_required_logs_and_skips_on_transport_failure() {
    let state = SharedState::new(sample_backends(1), vec![], 16);
    let before = state.backends().read()[0].status;
    let watchdog = FailingWatchdog;
    let config = test_config();
    let dir = tempfile::tempdir().unwrap();
    let status_file = test_status_file(&dir);

    reconcile_with_leader(&state, &watchdog, &config, &status_file).await;

    assert_eq!(state.backends().read()[0].status, before);
}

#[test]
fn reap_surfaces_the_fatal_exit_code() {
    let state = SharedState::new(vec![], vec![WorkerSlot::new(WorkerKind::Query, 0, 0)], 16);
    let registry: WorkerRegistry<crate::collaborators::ProcessWorkerLauncher> = WorkerRegistry::new(
        crate::collaborators::ProcessWorkerLauncher::new("/bin/true".into(), "/dev/null".into()),
    );
    // No real children tracked, so reap_exited finds nothing: exercising
    // the ECHILD/no-op path rather than the fatal path (which requires a
    // real subprocess exiting with FATAL_EXIT_CODE, covered at the
    // `pgsup-engine` layer).
    assert!(reap(&registry, &state).is_none());
}

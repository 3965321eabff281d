// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failover Engine: the supervisor-only state machine that drains the
//! request queue, applies node-state transitions, decides restart scope,
//! and runs the external commands. Ties together the
//! Worker Registry, Primary Finder, and Follow-Primary Lock.

use async_trait::async_trait;
use nix::sys::signal::Signal;
use pgsup_core::backend::NodeId;
use pgsup_core::{
    now_ms, BackendDescriptor, BackendRole, BackendStatus, Config, NodeStateRequest, RequestKind, WorkerKind,
};
use pgsup_state::{persistence::PersistedStatus, SharedState, StatusFile};
use std::time::Duration;

use crate::commands::{self, CommandContext, NodeRef};
use crate::error::{EngineError, Result};
use crate::follow_primary::FollowPrimaryLock;
use crate::primary_finder::{self, FindResult, PrimaryProbe};
use crate::registry::WorkerRegistry;

/// Broadcasts `wd_failover_start`/`wd_failover_end` to peer supervisors so
/// they quiesce conflicting operations while this one runs. The wire
/// shape is [`pgsup_wire::WatchdogMessage`]; the
/// transport that actually reaches the peers is external.
#[async_trait]
pub trait PeerCoordinator: Send + Sync + 'static {
    async fn broadcast(&self, message: pgsup_wire::WatchdogMessage) -> std::result::Result<(), pgsup_wire::ProtocolError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartScope {
    Full,
    Selective(Vec<NodeId>),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverOutcome {
    pub restart_scope: RestartScope,
    pub new_main_node_id: i32,
    pub new_primary_node_id: i32,
}

pub struct FailoverEngine<'a, P, C, L> {
    state: &'a SharedState,
    registry: &'a WorkerRegistry<L>,
    probe: &'a P,
    peer: &'a C,
    config: &'a Config,
    status_file: &'a StatusFile,
}

impl<'a, P: PrimaryProbe, C: PeerCoordinator, L: crate::registry::WorkerLauncher> FailoverEngine<'a, P, C, L> {
    pub fn new(
        state: &'a SharedState,
        registry: &'a WorkerRegistry<L>,
        probe: &'a P,
        peer: &'a C,
        config: &'a Config,
        status_file: &'a StatusFile,
    ) -> Self {
        Self { state, registry, probe, peer, config, status_file }
    }

    /// Persists the current backend-status vector, honoring
    /// `persistence::save`'s all-DOWN skip-write rule. Non-fatal: a
    /// transition that already committed to in-memory state is never
    /// rolled back because the on-disk mirror failed to write.
    fn persist_status(&self) {
        let statuses: Vec<_> =
            self.state.backends().read().iter().map(|b| PersistedStatus::from_backend_status(b.status)).collect();
        if let Err(e) = self.status_file.save(&statuses) {
            tracing::warn!(error = %e, "failed to persist status file after transition");
        }
    }

    /// Drains the request queue under `switching = true`, releasing it
    /// once empty. Returns the number of
    /// requests processed.
    pub async fn drain(&self) -> Result<usize> {
        self.state.request_info().lock().switching = true;
        let mut processed = 0;
        loop {
            let next = self.state.request_info().lock().queue.dequeue();
            let Some(request) = next else { break };
            match self.apply_one(request).await {
                Ok(_) => processed += 1,
                Err(e) => tracing::warn!(error = %e, "request rejected"),
            }
        }
        if processed > 0 {
            if let Err(e) = self.registry.restart_slot_kind(self.state, WorkerKind::Pcp) {
                tracing::error!(error = %e, "failed to restart pcp worker");
            }
        }
        self.state.request_info().lock().switching = false;
        Ok(processed)
    }

    fn validate(&self, backends: &[BackendDescriptor], request: &NodeStateRequest) -> Result<()> {
        for &id in &request.node_ids {
            let backend =
                backends.iter().find(|b| b.id == id).ok_or(EngineError::NodeIdOutOfRange(id))?;
            match request.kind {
                RequestKind::NodeUp if backend.status == BackendStatus::Up && !request.flags.confirmed => {
                    return Err(EngineError::RequestRejected(format!("node {id} is already up")));
                }
                RequestKind::NodeDown | RequestKind::Quarantine if !backend.is_valid() => {
                    return Err(EngineError::RequestRejected(format!("node {id} is not currently valid")));
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn apply_one(&self, request: NodeStateRequest) -> Result<FailoverOutcome> {
        let backends_before = self.state.backends().read().clone();
        self.validate(&backends_before, &request)?;

        let _ = self
            .peer
            .broadcast(pgsup_wire::WatchdogMessage::FailoverStart { node_ids: request.node_ids.clone() })
            .await;

        let (ri_main, ri_primary) = {
            let ri = self.state.request_info().lock();
            (ri.main_node_id, ri.primary_node_id)
        };
        let all_down_before = backends_before.iter().all(|b| !b.is_valid());
        let touches_previous_primary = request.node_ids.contains(&ri_primary);

        let now_ms = now_ms();
        let mut promote_target = None;
        {
            let mut backends = self.state.backends().write();
            match request.kind {
                RequestKind::NodeUp => {
                    for &id in &request.node_ids {
                        let Some(b) = backends.iter_mut().find(|b| b.id == id) else { continue };
                        let was_primary = b.role == BackendRole::Primary;
                        b.set_status(BackendStatus::ConnectWait, now_ms);
                        b.quarantined = false;
                        if request.flags.update && was_primary {
                            self.state.request_info().lock().primary_node_id = id;
                        }
                    }
                }
                RequestKind::NodeDown | RequestKind::Quarantine => {
                    for &id in &request.node_ids {
                        let Some(b) = backends.iter_mut().find(|b| b.id == id) else { continue };
                        b.set_status(BackendStatus::Down, now_ms);
                        if matches!(request.kind, RequestKind::Quarantine) {
                            b.quarantined = true;
                        }
                    }
                }
                RequestKind::Promote => {
                    promote_target = request.node_ids.first().copied();
                }
                RequestKind::CloseIdle => {
                    self.registry.signal_kind(self.state, WorkerKind::Query, Signal::SIGUSR1);
                }
            }
        }
        self.persist_status();

        let new_main_node_id = get_next_main_node(&self.state.backends().read());
        self.state.request_info().lock().main_node_id = new_main_node_id;

        let new_primary_node_id = self.determine_new_primary(&request, promote_target, ri_primary).await?;
        self.state.request_info().lock().primary_node_id = new_primary_node_id;

        let restart_scope = self.decide_restart_scope(
            &request,
            new_primary_node_id,
            ri_primary,
            all_down_before,
            touches_previous_primary,
        );
        self.apply_restart_scope(&restart_scope);

        self.run_external_commands(&request, &backends_before, ri_main, ri_primary, new_main_node_id, new_primary_node_id)
            .await;

        self.run_follow_primary_protocol(&request, new_primary_node_id, ri_primary).await;

        let _ = self
            .peer
            .broadcast(pgsup_wire::WatchdogMessage::FailoverEnd { node_ids: request.node_ids.clone() })
            .await;

        Ok(FailoverOutcome { restart_scope, new_main_node_id, new_primary_node_id })
    }

    async fn determine_new_primary(
        &self,
        request: &NodeStateRequest,
        promote_target: Option<NodeId>,
        current_primary: i32,
    ) -> Result<i32> {
        let backends = self.state.backends().read().clone();
        if let Some(always) = backends.iter().find(|b| b.flags.always_primary) {
            return Ok(always.id);
        }
        if let Some(id) = promote_target {
            return Ok(id);
        }
        if !request.flags.switchover && request.flags.update {
            // explicit quarantine-related request: keep current primary,
            // no rediscovery — except when there is no current primary at
            // all (-1) and the node being restored was formerly primary,
            // in which case there is nothing ambiguous to preserve and the
            // recovering node is restored as primary.
            if current_primary < 0 {
                if let Some(id) =
                    backends.iter().find(|b| b.role == BackendRole::Primary && request.node_ids.contains(&b.id)).map(|b| b.id)
                {
                    return Ok(id);
                }
            }
            return Ok(current_primary);
        }
        let standby_down = self.config.streaming_replication_mode
            && matches!(request.kind, RequestKind::NodeDown)
            && !request.node_ids.contains(&current_primary);
        if standby_down {
            return Ok(current_primary);
        }

        let follow_primary_ongoing = self.state.follow_primary().lock().ongoing;
        let timeout = Duration::from_secs(self.config.search_primary_node_timeout);
        match primary_finder::find_primary_node_with_retry(
            self.probe,
            || backends.iter().filter(|b| b.is_valid()).cloned().collect(),
            self.config.detach_false_primary,
            timeout,
            current_primary,
            follow_primary_ongoing,
        )
        .await
        {
            FindResult::Found(id, invalid) => {
                for bad in invalid {
                    self.state.enqueue(pgsup_core::NodeStateRequest::new(
                        RequestKind::NodeDown,
                        vec![bad],
                    ).with_flags(pgsup_core::RequestFlags::switchover_confirmed()));
                }
                Ok(id)
            }
            FindResult::AllDown => Ok(-1),
            FindResult::TimedOut => Ok(current_primary),
            FindResult::FollowPrimaryOngoing(id) => Ok(id),
        }
    }

    fn decide_restart_scope(
        &self,
        request: &NodeStateRequest,
        new_primary: i32,
        old_primary: i32,
        all_down_before: bool,
        touches_previous_primary: bool,
    ) -> RestartScope {
        let primary_changed = new_primary != old_primary;
        if !self.config.streaming_replication_mode || primary_changed || all_down_before || touches_previous_primary {
            return RestartScope::Full;
        }
        let is_switchover_of_standby = request.flags.switchover && !request.node_ids.contains(&old_primary);
        let is_standby_failback = matches!(request.kind, RequestKind::NodeUp) && !request.node_ids.contains(&old_primary);
        if is_switchover_of_standby || is_standby_failback {
            return RestartScope::Selective(request.node_ids.clone());
        }
        RestartScope::None
    }

    fn apply_restart_scope(&self, scope: &RestartScope) {
        let mut workers = self.state.workers().write();
        match scope {
            RestartScope::Full => {
                for slot in workers.iter_mut() {
                    slot.need_restart = true;
                }
            }
            RestartScope::Selective(ids) => {
                for slot in workers.iter_mut() {
                    if ids.iter().any(|&id| slot.routes_to(id)) {
                        slot.need_restart = true;
                    }
                }
            }
            RestartScope::None => {
                for slot in workers.iter_mut() {
                    slot.need_restart = true;
                }
            }
        }
    }

    async fn run_external_commands(
        &self,
        request: &NodeStateRequest,
        backends_before: &[BackendDescriptor],
        old_main_id: i32,
        old_primary_id: i32,
        new_main_id: i32,
        new_primary_id: i32,
    ) {
        let template = match request.kind {
            RequestKind::NodeDown | RequestKind::Quarantine => self.config.failover_command.as_deref(),
            RequestKind::NodeUp if !request.flags.update => self.config.failback_command.as_deref(),
            _ => None,
        };
        let Some(template) = template else { return };

        let new_main = backends_after_lookup(self.state, new_main_id);
        let old_primary = backends_before.iter().find(|b| b.id == old_primary_id).map(node_ref);
        for &id in &request.node_ids {
            let failed = backends_before.iter().find(|b| b.id == id).map(node_ref);
            let ctx = CommandContext {
                failed,
                new_main: new_main.clone(),
                old_main_id: if old_main_id >= 0 { Some(old_main_id) } else { None },
                old_primary: old_primary.clone(),
            };
            if let Err(e) = commands::run(template, &ctx).await {
                tracing::error!(error = %e, node_id = id, "failed to invoke external command");
            }
        }
        let _ = new_primary_id;
    }

    async fn run_follow_primary_protocol(&self, request: &NodeStateRequest, new_primary: i32, old_primary: i32) {
        let Some(template) = self.config.follow_primary_command.clone() else { return };
        if !self.config.streaming_replication_mode {
            return;
        }
        let primary_went_down = matches!(request.kind, RequestKind::NodeDown) && request.node_ids.contains(&old_primary);
        let is_promote = matches!(request.kind, RequestKind::Promote);
        if !primary_went_down && !is_promote {
            return;
        }

        let down_nodes: Vec<BackendDescriptor> = {
            let mut backends = self.state.backends().write();
            let now_ms = now_ms();
            for b in backends.iter_mut() {
                if b.id != new_primary {
                    b.set_status(BackendStatus::Down, now_ms);
                }
            }
            backends.iter().filter(|b| b.id != new_primary).cloned().collect()
        };

        let lock = FollowPrimaryLock::new(self.state.follow_primary());
        if !lock.acquire(true, false) {
            tracing::warn!("could not acquire follow-primary lock");
            return;
        }
        for down in down_nodes {
            let ctx = CommandContext {
                failed: Some(node_ref(&down)),
                new_main: None,
                old_main_id: None,
                old_primary: None,
            };
            if let Err(e) = commands::run(&template, &ctx).await {
                tracing::error!(error = %e, node_id = down.id, "follow-primary command failed");
            }
        }
        lock.release(false);
    }
}

/// Lowest-indexed currently-valid backend; `-1` if none.
pub fn get_next_main_node(backends: &[BackendDescriptor]) -> i32 {
    backends.iter().filter(|b| b.is_valid()).map(|b| b.id).min().unwrap_or(-1)
}

fn node_ref(b: &BackendDescriptor) -> NodeRef {
    NodeRef { id: b.id, host: b.host.clone(), port: b.port, data_directory: b.data_directory.clone() }
}

fn backends_after_lookup(state: &SharedState, id: i32) -> Option<NodeRef> {
    if id < 0 {
        return None;
    }
    state.backends().read().iter().find(|b| b.id == id).map(node_ref)
}

#[cfg(test)]
#[path = "failover_tests.rs"]
mod tests;

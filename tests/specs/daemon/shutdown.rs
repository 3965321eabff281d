//! Coordinated shutdown specs: SIGTERM drains the worker fleet, persists
//! status, removes socket files, and exits cleanly exactly once
//! (spec.md §4.1, §8).

use crate::prelude::*;

#[test]
fn sigterm_causes_clean_exit() {
    let project = Project::new();
    let daemon = project.spawn_daemon(&[]);
    wait_for(SPEC_WAIT_MAX_MS, || project.socket_dir().join(".s.PGSQL.15432").exists());

    daemon.terminate();
    assert!(daemon.wait_exited(SPEC_WAIT_MAX_MS), "daemon should exit after SIGTERM");
}

#[test]
fn sigterm_removes_client_and_pcp_socket_files() {
    let project = Project::new();
    let daemon = project.spawn_daemon(&[]);
    let client_socket = project.socket_dir().join(".s.PGSQL.15432");
    let pcp_socket = project.socket_dir().join(".s.PGSQL.15433");
    wait_for(SPEC_WAIT_MAX_MS, || client_socket.exists() && pcp_socket.exists());

    daemon.terminate();
    daemon.wait_exited(SPEC_WAIT_MAX_MS);

    let cleaned = wait_for(SPEC_WAIT_MAX_MS, || !client_socket.exists() && !pcp_socket.exists());
    assert!(cleaned, "socket files should be removed on shutdown");
}

#[test]
fn sigterm_persists_status_before_exit() {
    let project = Project::new();
    let daemon = project.spawn_daemon(&[]);
    wait_for(SPEC_WAIT_MAX_MS, || project.status_file_path().exists());

    daemon.terminate();
    daemon.wait_exited(SPEC_WAIT_MAX_MS);

    let contents = std::fs::read_to_string(project.status_file_path()).expect("status file should survive shutdown");
    assert!(!contents.trim().is_empty(), "status file should not be emptied by shutdown");
}

#[test]
fn releases_pid_lock_so_next_instance_can_start() {
    let project = Project::new();
    let daemon = project.spawn_daemon(&[]);
    wait_for(SPEC_WAIT_MAX_MS, || project.log_dir().join("pgsupd.pid").exists());

    daemon.terminate();
    assert!(daemon.wait_exited(SPEC_WAIT_MAX_MS), "daemon should exit after SIGTERM");

    // A stale lock here would make every later startup spec flaky; this is
    // the one spec that checks the lock file's FD is actually released, not
    // just that the file happens to still be on disk.
    let second = project.spawn_daemon(&[]);
    let started = wait_for(SPEC_WAIT_MAX_MS, || second.is_running());
    assert!(started, "a fresh instance should acquire the lock once the old one released it");
    second.terminate();
    second.wait_exited(SPEC_WAIT_MAX_MS);
}

#[test]
fn second_sigterm_during_shutdown_is_a_no_op() {
    let project = Project::new();
    let daemon = project.spawn_daemon(&[]);
    wait_for(SPEC_WAIT_MAX_MS, || project.socket_dir().join(".s.PGSQL.15432").exists());

    // Racing signals land on the same `exit()` guard (`SharedState::exit`);
    // the second is a no-op, not a second teardown stacked on the first.
    daemon.terminate();
    daemon.terminate();
    assert!(daemon.wait_exited(SPEC_WAIT_MAX_MS), "daemon should still exit cleanly once");
}

//! Startup sequencing specs: pid lock, socket creation, and the
//! first-boot status vector (spec.md §4.1, §4.9).

use crate::prelude::*;

#[test]
fn startup_creates_client_and_pcp_sockets() {
    let project = Project::new();
    let daemon = project.spawn_daemon(&[]);

    let client_up = wait_for(SPEC_WAIT_MAX_MS, || project.socket_dir().join(".s.PGSQL.15432").exists());
    assert!(client_up, "client socket should be created");

    let pcp_up = wait_for(SPEC_WAIT_MAX_MS, || project.socket_dir().join(".s.PGSQL.15433").exists());
    assert!(pcp_up, "pcp socket should be created");

    daemon.terminate();
    daemon.wait_exited(SPEC_WAIT_MAX_MS);
}

#[test]
fn startup_writes_pid_lock_file() {
    let project = Project::new();
    let daemon = project.spawn_daemon(&[]);

    let pid_file = project.log_dir().join("pgsupd.pid");
    let locked = wait_for(SPEC_WAIT_MAX_MS, || pid_file.exists());
    assert!(locked, "pid lock file should be created under log_dir");

    daemon.terminate();
    daemon.wait_exited(SPEC_WAIT_MAX_MS);
}

#[test]
fn second_instance_refuses_to_start_while_first_holds_the_lock() {
    let project = Project::new();
    let first = project.spawn_daemon(&[]);

    let locked = wait_for(SPEC_WAIT_MAX_MS, || project.log_dir().join("pgsupd.pid").exists());
    assert!(locked, "first instance should acquire the pid lock");

    // Give the first instance time to also bind its sockets, so the second
    // instance's failure is unambiguously the lock, not a socket race.
    wait_for(SPEC_WAIT_MAX_MS, || project.socket_dir().join(".s.PGSQL.15432").exists());

    pgsupd().arg("--config").arg(project.config_path()).fails();

    first.terminate();
    first.wait_exited(SPEC_WAIT_MAX_MS);
}

#[test]
fn startup_persists_first_boot_status_vector() {
    let project = Project::new();
    let daemon = project.spawn_daemon(&[]);

    let written = wait_for(SPEC_WAIT_MAX_MS, || project.status_file_path().exists());
    assert!(written, "status file should be written on first boot");

    let contents = std::fs::read_to_string(project.status_file_path()).expect("read status file");
    // First boot: every backend loads as CONNECT_WAIT, which persists as `up`.
    assert_eq!(contents.lines().filter(|l| !l.trim().is_empty()).count(), 2);
    assert!(contents.lines().all(|l| l.trim() == "up"), "got: {contents:?}");

    daemon.terminate();
    daemon.wait_exited(SPEC_WAIT_MAX_MS);
}

#[test]
fn instance_can_restart_after_previous_instance_exits() {
    let project = Project::new();
    let first = project.spawn_daemon(&[]);
    wait_for(SPEC_WAIT_MAX_MS, || project.log_dir().join("pgsupd.pid").exists());
    first.terminate();
    assert!(first.wait_exited(SPEC_WAIT_MAX_MS), "first instance should exit");
    drop(first);

    let second = project.spawn_daemon(&[]);
    let locked = wait_for(SPEC_WAIT_MAX_MS, || second.is_running());
    assert!(locked, "second instance should start once the lock is released");

    second.terminate();
    second.wait_exited(SPEC_WAIT_MAX_MS);
}

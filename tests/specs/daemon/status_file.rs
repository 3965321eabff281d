//! Status-file recovery specs: legacy token support, the bogus-file
//! coercion rule, and `--discard-status` (spec.md §4.9, §8 round-trip
//! laws).

use crate::prelude::*;

#[test]
fn discard_status_wipes_existing_status_file() {
    let project = Project::new();
    std::fs::write(project.status_file_path(), "down\ndown\n").expect("seed status file");

    let daemon = project.spawn_daemon(&["--discard-status"]);
    wait_for(SPEC_WAIT_MAX_MS, || project.socket_dir().join(".s.PGSQL.15432").exists());

    let contents = std::fs::read_to_string(project.status_file_path()).expect("status file should be rewritten");
    assert!(contents.lines().all(|l| l.trim() == "up"), "discard-status should re-seed CONNECT_WAIT; got {contents:?}");

    daemon.terminate();
    daemon.wait_exited(SPEC_WAIT_MAX_MS);
}

#[test]
fn legacy_single_character_tokens_are_accepted_on_load() {
    let project = Project::new();
    std::fs::write(project.status_file_path(), "U\nD\n").expect("seed legacy status file");

    let daemon = project.spawn_daemon(&[]);

    // A legacy file with at least one `U` is not bogus, so it loads as
    // written rather than being coerced; the second backend carries `D`
    // (DOWN) through to the rewritten file once startup re-persists it.
    let rewritten = wait_for(SPEC_WAIT_MAX_MS, || {
        std::fs::read_to_string(project.status_file_path()).map(|c| c.lines().count() == 2).unwrap_or(false)
    });
    assert!(rewritten, "status file should be rewritten in the current text format after load");

    let contents = std::fs::read_to_string(project.status_file_path()).expect("read status file");
    let lines: Vec<_> = contents.lines().map(str::trim).collect();
    assert_eq!(lines[0], "up");
    assert_eq!(lines[1], "down");

    daemon.terminate();
    daemon.wait_exited(SPEC_WAIT_MAX_MS);
}

#[test]
fn bogus_status_file_with_no_up_entries_coerces_to_connect_wait() {
    let project = Project::new();
    // No `up` entries anywhere: a file that never saw a successful
    // connection, which the loader treats as untrustworthy rather than a
    // confirmed all-down cluster.
    std::fs::write(project.status_file_path(), "down\ndown\n").expect("seed bogus status file");

    let daemon = project.spawn_daemon(&[]);

    let rewritten = wait_for(SPEC_WAIT_MAX_MS, || {
        std::fs::read_to_string(project.status_file_path())
            .map(|c| c.lines().all(|l| l.trim() == "up"))
            .unwrap_or(false)
    });
    assert!(rewritten, "a bogus (all-down) status file should coerce every backend to CONNECT_WAIT");

    daemon.terminate();
    daemon.wait_exited(SPEC_WAIT_MAX_MS);
}

#[test]
fn missing_status_file_starts_every_backend_connect_wait() {
    let project = Project::new();
    assert!(!project.status_file_path().exists());

    let daemon = project.spawn_daemon(&[]);

    let written = wait_for(SPEC_WAIT_MAX_MS, || project.status_file_path().exists());
    assert!(written, "status file should be created on first boot");
    let contents = std::fs::read_to_string(project.status_file_path()).expect("read status file");
    assert!(contents.lines().all(|l| l.trim() == "up"));

    daemon.terminate();
    daemon.wait_exited(SPEC_WAIT_MAX_MS);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn file_in(dir: &tempfile::TempDir, name: &str) -> StatusFile {
    StatusFile::new(dir.path().join(name))
}

#[test]
fn missing_file_loads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let file = file_in(&dir, "pgpool_status");
    assert!(file.load().unwrap().is_none());
}

#[test]
fn round_trips_up_down_unused() {
    let dir = tempfile::tempdir().unwrap();
    let file = file_in(&dir, "pgpool_status");
    let statuses = vec![PersistedStatus::Up, PersistedStatus::Down, PersistedStatus::Unused];
    file.save(&statuses).unwrap();
    assert_eq!(file.load().unwrap().unwrap(), statuses);
}

#[test]
fn all_down_write_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let file = file_in(&dir, "pgpool_status");
    file.save(&[PersistedStatus::Up, PersistedStatus::Down]).unwrap();
    file.save(&[PersistedStatus::Down, PersistedStatus::Down]).unwrap();
    assert_eq!(
        file.load().unwrap().unwrap(),
        vec![PersistedStatus::Up, PersistedStatus::Down],
        "an all-down write must not overwrite the previous vector"
    );
}

#[test]
fn bogus_file_with_no_up_entries_coerces_to_up() {
    let dir = tempfile::tempdir().unwrap();
    let file = file_in(&dir, "pgpool_status");
    std::fs::write(file.path(), "unused\nunused\n").unwrap();
    let loaded = file.load().unwrap().unwrap();
    assert!(loaded.iter().all(|s| matches!(s, PersistedStatus::Up)));
}

#[test]
fn legacy_single_char_tokens_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let file = file_in(&dir, "pgpool_status");
    std::fs::write(file.path(), "U\nD\nN\n").unwrap();
    assert_eq!(
        file.load().unwrap().unwrap(),
        vec![PersistedStatus::Up, PersistedStatus::Down, PersistedStatus::Unused]
    );
}

#[test]
fn discard_removes_file_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let file = file_in(&dir, "pgpool_status");
    file.save(&[PersistedStatus::Up]).unwrap();
    file.discard().unwrap();
    assert!(file.load().unwrap().is_none());
    file.discard().unwrap();
}

#[test]
fn persisted_status_round_trips_through_backend_status() {
    for status in [PersistedStatus::Down, PersistedStatus::Unused] {
        assert_eq!(PersistedStatus::from_backend_status(status.into_backend_status()), status);
    }
    // Up -> ConnectWait -> Up, since a restored backend is re-validated.
    assert_eq!(
        PersistedStatus::from_backend_status(PersistedStatus::Up.into_backend_status()),
        PersistedStatus::Up
    );
}

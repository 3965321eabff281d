//! CLI surface specs: `--help`/`--version` output, and the baseline
//! failure mode when required flags are missing.

use crate::prelude::*;

#[test]
fn help_shows_usage() {
    pgsupd().arg("--help").passes().stdout_has("Usage:");
}

#[test]
fn help_documents_config_flag() {
    pgsupd().arg("--help").passes().stdout_has("--config");
}

#[test]
fn help_documents_discard_status_flag() {
    pgsupd().arg("--help").passes().stdout_has("--discard-status");
}

#[test]
fn version_shows_version() {
    pgsupd().arg("--version").passes().stdout_has("pgsupd");
}

#[test]
fn missing_config_flag_fails_with_usage_error() {
    pgsupd().fails().stderr_has("--config");
}

#[test]
fn nonexistent_config_file_fails_cleanly() {
    let project = Project::new();
    let missing = project.path().join("does-not-exist.toml");
    pgsupd().arg("--config").arg(&missing).fails().stderr_has("failed to load configuration");
}

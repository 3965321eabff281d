//! Shared test scaffolding: a throwaway project directory with a minimal
//! `pgsupd` config, and a handle to a spawned supervisor process.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::{Duration, Instant};

pub const SPEC_WAIT_MAX_MS: u64 = 5_000;

/// Polls `check` every 50ms until it returns `true` or `max_ms` elapses.
/// Returns the final result of `check` either way, so callers can still
/// assert with a useful message on timeout.
pub fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return check();
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

pub fn pgsupd_binary() -> PathBuf {
    assert_cmd::cargo::cargo_bin("pgsupd")
}

/// One-shot `pgsupd` invocation (`--help`, a startup failure case, ...),
/// in the `.passes()`/`.fails()`/`.stdout_has()` builder style.
pub fn pgsupd() -> PgsupdCmd {
    PgsupdCmd { cmd: assert_cmd::Command::new(pgsupd_binary()) }
}

pub struct PgsupdCmd {
    cmd: assert_cmd::Command,
}

impl PgsupdCmd {
    pub fn arg(mut self, arg: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.arg(arg);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.cmd.args(args);
        self
    }

    pub fn passes(mut self) -> CmdOutput {
        let assert = self.cmd.assert().success();
        CmdOutput::from_assert(assert)
    }

    pub fn fails(mut self) -> CmdOutput {
        let assert = self.cmd.assert().failure();
        CmdOutput::from_assert(assert)
    }
}

pub struct CmdOutput {
    stdout: String,
    stderr: String,
}

impl CmdOutput {
    fn from_assert(assert: assert_cmd::assert::Assert) -> Self {
        let output = assert.get_output();
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "expected stdout to contain {needle:?}, got:\n{}", self.stdout);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "expected stderr to contain {needle:?}, got:\n{}", self.stderr);
        self
    }
}

/// A throwaway directory holding one `pgsupd` config and every path it
/// points at (sockets, logs, status file). Two backends, neither real —
/// enough for startup/shutdown/status-file specs, which never need a live
/// probe connection.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp project dir");
        std::fs::create_dir_all(dir.path().join("sockets")).expect("create sockets dir");
        std::fs::create_dir_all(dir.path().join("log")).expect("create log dir");
        let project = Self { dir };
        std::fs::write(project.config_path(), project.default_config_toml()).expect("write config.toml");
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.path().join("log")
    }

    pub fn socket_dir(&self) -> PathBuf {
        self.path().join("sockets")
    }

    pub fn status_file_path(&self) -> PathBuf {
        self.log_dir().join("pgpool_status")
    }

    fn default_config_toml(&self) -> String {
        format!(
            r#"
num_init_children = 2
max_pool = 1
port = 15432
pcp_port = 15433
socket_dir = "{socket_dir}"
pcp_socket_dir = "{socket_dir}"
log_dir = "{log_dir}"
status_file_path = "{status_file}"
streaming_replication_mode = true

[[backends]]
host = "127.0.0.1"
port = 25432
data_directory = "/var/lib/postgres/0"

[[backends]]
host = "127.0.0.1"
port = 25433
data_directory = "/var/lib/postgres/1"
"#,
            socket_dir = self.socket_dir().display(),
            log_dir = self.log_dir().display(),
            status_file = self.status_file_path().display(),
        )
    }

    /// Spawns `pgsupd --config <project>/config.toml` in the background.
    /// The caller owns shutdown; [`DaemonHandle`] sends SIGKILL on drop so
    /// a failed assertion never leaks a supervisor into the test run.
    pub fn spawn_daemon(&self, extra_args: &[&str]) -> DaemonHandle {
        let child = Command::new(pgsupd_binary())
            .arg("--config")
            .arg(self.config_path())
            .args(extra_args)
            .spawn()
            .expect("spawn pgsupd");
        DaemonHandle { child }
    }
}

pub struct DaemonHandle {
    child: Child,
}

impl DaemonHandle {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Sends SIGTERM via the `kill` utility rather than linking `nix` into
    /// the spec harness: the supervisor's own shutdown path is what these
    /// specs exercise, not the signal delivery mechanism.
    pub fn terminate(&self) {
        let _ = Command::new("kill").arg("-TERM").arg(self.pid().to_string()).status();
    }

    pub fn is_running(&self) -> bool {
        Command::new("kill").arg("-0").arg(self.pid().to_string()).status().map(|s| s.success()).unwrap_or(false)
    }

    pub fn wait_exited(&self, max_ms: u64) -> bool {
        wait_for(max_ms, || !self.is_running())
    }
}

impl Drop for DaemonHandle {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

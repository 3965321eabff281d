// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn minimal_toml() -> &'static str {
    r#"
        num_init_children = 4
        max_pool = 2
        port = 9999
        pcp_port = 9898
        socket_dir = "/tmp/pgsup"
        pcp_socket_dir = "/tmp/pgsup"
        log_dir = "/tmp/pgsup/log"
        status_file_path = "/tmp/pgsup/pgpool_status"

        [[backends]]
        host = "localhost"
        port = 5432
        data_directory = "/var/lib/postgresql/data0"
    "#
}

#[test]
fn loads_minimal_config_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pgpool.toml");
    std::fs::write(&path, minimal_toml()).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.backend_count(), 1);
    assert_eq!(config.listen_backlog_multiplier, 2);
    assert_eq!(config.max_listen_backlog, 10000);
    assert!(config.streaming_replication_mode);
    assert!(!config.use_watchdog);
    assert!(!config.discard_status);
}

#[test]
fn rejects_empty_backend_list() {
    let config = Config {
        backends: vec![],
        num_init_children: 4,
        max_pool: 2,
        port: 9999,
        pcp_port: 9898,
        listen_addresses: vec![],
        socket_dir: "/tmp".into(),
        pcp_socket_dir: "/tmp".into(),
        listen_backlog_multiplier: 2,
        max_listen_backlog: 10000,
        detach_false_primary: false,
        failover_command: None,
        failback_command: None,
        follow_primary_command: None,
        search_primary_node_timeout: 0,
        use_watchdog: false,
        watchdog_peers: vec![],
        memory_cache_enabled: false,
        primary_probe_command: None,
        enable_shared_relcache: false,
        streaming_replication_mode: true,
        log_dir: "/tmp".into(),
        status_file_path: "/tmp/status".into(),
        discard_status: false,
        clear_memcache_oidmaps: false,
    };
    assert!(config.validate().is_err());
}

#[test]
fn listen_backlog_is_capped() {
    let mut config = load_for_test();
    config.num_init_children = 100_000;
    config.listen_backlog_multiplier = 2;
    config.max_listen_backlog = 10000;
    assert_eq!(config.listen_backlog(), 10000);
}

#[test]
fn discard_status_setter_is_fluent() {
    let config = load_for_test().discard_status(true);
    assert!(config.discard_status);
}

fn load_for_test() -> Config {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pgpool.toml");
    std::fs::write(&path, minimal_toml()).unwrap();
    Config::load(&path).unwrap()
}

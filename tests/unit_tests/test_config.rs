// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use anyhow::{Context, Result};
use blockrpc_client_rs::cfg::{cli::config_path_from_env, config::Config};

#[test]
fn test_load_full_config() -> Result<()> {
    let cfg = config_path_from_env("tests/config.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    assert_eq!(cfg.connection.socket_path, "/tmp/blockrpc-client.sock");
    assert_eq!(cfg.connection.retry_interval, Duration::from_secs(5));
    assert_eq!(cfg.connection.retry_counts, 5);
    assert_eq!(cfg.connection.request_timeout, Duration::from_secs(15));
    assert_eq!(cfg.runtime.timeout_connection, Duration::from_secs(30));
    Ok(())
}

#[test]
fn test_minimal_config_gets_defaults() -> Result<()> {
    let yaml = r#"
Connection:
  SocketPath: "/run/peer.sock"
"#;
    let mut cfg: Config = serde_yaml::from_str(yaml)?;
    cfg.validate_and_normalize()?;

    assert_eq!(cfg.connection.retry_interval, Duration::from_secs(5));
    assert_eq!(cfg.connection.retry_counts, 5);
    assert_eq!(cfg.connection.request_timeout, Duration::from_secs(15));
    assert_eq!(cfg.runtime.timeout_connection, Duration::from_secs(30));
    Ok(())
}

#[test]
fn test_zero_retries_rejected() {
    let yaml = r#"
Connection:
  SocketPath: "/run/peer.sock"
  RetryCounts: 0
"#;
    let mut cfg: Config = serde_yaml::from_str(yaml).expect("parses");
    assert!(cfg.validate_and_normalize().is_err());
}

#[test]
fn test_empty_socket_path_rejected() {
    let yaml = r#"
Connection:
  SocketPath: ""
"#;
    let mut cfg: Config = serde_yaml::from_str(yaml).expect("parses");
    assert!(cfg.validate_and_normalize().is_err());
}

#[test]
fn test_zero_request_timeout_rejected() {
    let yaml = r#"
Connection:
  SocketPath: "/run/peer.sock"
  RequestTimeout: 0
"#;
    let mut cfg: Config = serde_yaml::from_str(yaml).expect("parses");
    assert!(cfg.validate_and_normalize().is_err());
}

#[test]
fn test_programmatic_defaults() {
    let cfg = Config::for_socket_path("/run/peer.sock");
    assert_eq!(cfg.connection.socket_path, "/run/peer.sock");
    assert_eq!(cfg.connection.retry_counts, 5);
}

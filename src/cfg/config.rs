// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Where and how to reach the storage endpoint.
    #[serde(rename = "Connection")]
    pub connection: ConnectionConfig,
    /// Implementation/runtime parameters that live outside the protocol.
    #[serde(rename = "Runtime", default)]
    pub runtime: RuntimeConfig,
}

/// Endpoint address plus the request-level tunables.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ConnectionConfig {
    #[serde(rename = "SocketPath")]
    /// Filesystem path of the Unix stream socket.
    pub socket_path: String,

    #[serde(
        rename = "RetryInterval",
        with = "serde_secs",
        default = "default_retry_interval"
    )]
    /// Pause between connect attempts.
    pub retry_interval: Duration,

    #[serde(rename = "RetryCounts", default = "default_retry_counts")]
    /// How many connect attempts before giving up.
    pub retry_counts: u32,

    #[serde(
        rename = "RequestTimeout",
        with = "serde_secs",
        default = "default_request_timeout"
    )]
    /// Deadline applied to every in-flight request.
    pub request_timeout: Duration,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
/// Runtime-only settings that never reach the wire.
pub struct RuntimeConfig {
    #[serde(
        rename = "TimeoutConnection",
        with = "serde_secs",
        default = "default_timeout_connection"
    )]
    /// Upper bound on a single socket write.
    pub timeout_connection: Duration,
}

fn default_retry_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_retry_counts() -> u32 {
    5
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_timeout_connection() -> Duration {
    Duration::from_secs(30)
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            timeout_connection: default_timeout_connection(),
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Default tunables against a given socket path. Handy for callers that
    /// configure programmatically.
    pub fn for_socket_path<S: Into<String>>(path: S) -> Self {
        Config {
            connection: ConnectionConfig {
                socket_path: path.into(),
                retry_interval: default_retry_interval(),
                retry_counts: default_retry_counts(),
                request_timeout: default_request_timeout(),
            },
            runtime: RuntimeConfig::default(),
        }
    }

    /// Validates invariants.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            !self.connection.socket_path.is_empty(),
            "SocketPath must not be empty"
        );
        ensure!(self.connection.retry_counts >= 1, "RetryCounts must be >= 1");
        ensure!(
            !self.connection.request_timeout.is_zero(),
            "RequestTimeout must be > 0"
        );
        ensure!(
            !self.runtime.timeout_connection.is_zero(),
            "TimeoutConnection must be > 0"
        );
        Ok(())
    }
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

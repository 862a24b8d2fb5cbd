// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration related types used by the pod installer

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl Config {
    /// Load a `Config` from the given TOML file
    pub fn from_file<P: AsRef<Utf8Path>>(
        path: P,
    ) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|error| {
            ConfigError::Io { error, path: path.to_owned() }
        })?;
        toml::from_str(&data).map_err(|error| ConfigError::Parse {
            error,
            path: path.to_owned(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub path: Utf8PathBuf,
    /// Also log to stderr, filtered by `RUST_LOG`.
    pub stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { path: "/tmp/pod-installer.log".into(), stderr: false }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub ledger_path: Utf8PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ledger_path: "/etc/cloudcix/pod/installer-session.json".into() }
    }
}

/// Where the input snapshots are read from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    pub cidata_label: String,
    pub cidata_mount_dir: Utf8PathBuf,
    /// Mount the media before reading it. When false the mount directory is
    /// read as is.
    pub mount_cidata: bool,
    pub metadata_config: Utf8PathBuf,
    pub metadata_env: Utf8PathBuf,
    pub netplan: Utf8PathBuf,
    pub hostname_path: Utf8PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            cidata_label: "CIDATA".to_string(),
            cidata_mount_dir: "/mnt".into(),
            mount_cidata: true,
            metadata_config: "/etc/cloudcix/pod/configs/config.json".into(),
            metadata_env: "/etc/cloudcix/docker/.env".into(),
            netplan: "/etc/netplan/00-installer-config.yaml".into(),
            hostname_path: "/proc/sys/kernel/hostname".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    pub sysfs_net_dir: Utf8PathBuf,
    pub meminfo_path: Utf8PathBuf,
    pub ping_attempts: u32,
    pub ping_interval_ms: u64,
    pub ping_timeout_secs: u64,
}

impl ProbeConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            sysfs_net_dir: "/sys/class/net".into(),
            meminfo_path: "/proc/meminfo".into(),
            ping_attempts: 3,
            ping_interval_ms: 500,
            ping_timeout_secs: 2,
        }
    }
}

/// Minimum hardware a pod node must have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    pub cores_min: u64,
    pub ram_min_gb: u64,
    pub storage_min_gb: u64,
    pub podnet_ports_min: u64,
    pub appliance_ports_min: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cores_min: 20,
            ram_min_gb: 8,
            storage_min_gb: 300,
            podnet_ports_min: 5,
            appliance_ports_min: 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {path}")]
    Io {
        #[source]
        error: std::io::Error,
        path: Utf8PathBuf,
    },
    #[error("Failed to parse config file: {path}")]
    Parse {
        #[source]
        error: toml::de::Error,
        path: Utf8PathBuf,
    },
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reads the three input snapshots from the host.
//!
//! A missing document is not an error: it is captured as empty and the
//! checks that read it report "Not Found". A document that exists but
//! cannot be read or parsed is.

use crate::config::SourcesConfig;
use crate::probe::{execute, ExecutionError};
use camino::{Utf8Path, Utf8PathBuf};
use pod_installer_common::snapshot::{
    CidataSnapshot, EnvFile, InfraSnapshot, MetadataSnapshot, Netplan,
    PodConfig, Snapshots,
};
use serde_json::Value;
use slog::{debug, info, o, warn, Logger};
use std::process::Command;

pub const MOUNT: &str = "/usr/bin/mount";

/// Files read from the installation media, relative to the mount point.
const CIDATA_USER_DATA: &str = "user-data";
const CIDATA_CONFIG: &str = "config.json";
const CIDATA_ENV: &str = "env";

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to read {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("failed to parse {path} as JSON")]
    Json {
        path: Utf8PathBuf,
        #[source]
        err: serde_json::Error,
    },

    #[error("failed to parse {path} as YAML")]
    Yaml {
        path: Utf8PathBuf,
        #[source]
        err: serde_yaml::Error,
    },
}

/// Captures every snapshot. Called once, before the session is reset.
pub fn capture(
    log: &Logger,
    sources: &SourcesConfig,
) -> Result<Snapshots, CaptureError> {
    let log = log.new(o!("component" => "capture"));
    let cidata = capture_cidata(&log, sources)?;
    let infra = capture_infra(&log, sources)?;
    let metadata = capture_metadata(&log, sources)?;
    info!(
        log,
        "captured snapshots";
        "cidata_available" => cidata.available,
        "hostname" => &infra.hostname,
    );
    Ok(Snapshots { cidata, infra, metadata })
}

fn mount_cidata(
    sources: &SourcesConfig,
) -> Result<(), ExecutionError> {
    execute(
        Command::new(MOUNT)
            .arg("--label")
            .arg(&sources.cidata_label)
            .arg(&sources.cidata_mount_dir),
    )?;
    Ok(())
}

fn capture_cidata(
    log: &Logger,
    sources: &SourcesConfig,
) -> Result<CidataSnapshot, CaptureError> {
    let dir = &sources.cidata_mount_dir;
    let available = if sources.mount_cidata {
        match mount_cidata(sources) {
            Ok(()) => true,
            Err(err) => {
                info!(
                    log,
                    "installation media not mounted";
                    "label" => &sources.cidata_label,
                    "error" => %err,
                );
                false
            }
        }
    } else {
        dir.is_dir()
    };
    if !available {
        return Ok(CidataSnapshot::unavailable());
    }

    let user_data = match read_optional(log, &dir.join(CIDATA_USER_DATA))? {
        Some((path, contents)) => serde_yaml::from_str::<Value>(&contents)
            .map_err(|err| CaptureError::Yaml { path, err })?,
        None => Value::Null,
    };
    let config = read_pod_config(log, &dir.join(CIDATA_CONFIG))?;
    let env = read_env(log, &dir.join(CIDATA_ENV))?;
    Ok(CidataSnapshot { available, config, user_data, env })
}

fn capture_infra(
    log: &Logger,
    sources: &SourcesConfig,
) -> Result<InfraSnapshot, CaptureError> {
    let hostname = read_optional(log, &sources.hostname_path)?
        .map(|(_, contents)| contents.trim().to_string())
        .unwrap_or_default();
    let netplan = match read_optional(log, &sources.netplan)? {
        Some((path, contents)) => Netplan::from_yaml(&contents)
            .map_err(|err| CaptureError::Yaml { path, err })?,
        None => Netplan::default(),
    };
    Ok(InfraSnapshot { hostname, netplan })
}

fn capture_metadata(
    log: &Logger,
    sources: &SourcesConfig,
) -> Result<MetadataSnapshot, CaptureError> {
    let config = read_pod_config(log, &sources.metadata_config)?;
    let env = read_env(log, &sources.metadata_env)?;
    Ok(MetadataSnapshot { config, env })
}

fn read_pod_config(
    log: &Logger,
    path: &Utf8Path,
) -> Result<PodConfig, CaptureError> {
    match read_optional(log, path)? {
        Some((path, contents)) => serde_json::from_str(&contents)
            .map_err(|err| CaptureError::Json { path, err }),
        None => Ok(PodConfig::default()),
    }
}

fn read_env(log: &Logger, path: &Utf8Path) -> Result<EnvFile, CaptureError> {
    Ok(read_optional(log, path)?
        .map(|(_, contents)| EnvFile::parse(&contents))
        .unwrap_or_default())
}

/// Reads `path`, returning `None` if it does not exist.
fn read_optional(
    log: &Logger,
    path: &Utf8Path,
) -> Result<Option<(Utf8PathBuf, String)>, CaptureError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            debug!(log, "read snapshot document"; "path" => %path);
            Ok(Some((path.to_owned(), contents)))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(log, "snapshot document not found"; "path" => %path);
            Ok(None)
        }
        Err(err) => Err(CaptureError::Read { path: path.to_owned(), err }),
    }
}

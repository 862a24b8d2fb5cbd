// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host introspection used by the check bodies.
//!
//! Every fact a check needs about the running machine comes through
//! [`HostProbe`], so that tests can substitute [`crate::fakes::FakeProbe`]
//! and count how often each probe runs.

use crate::config::ProbeConfig;
use camino::Utf8PathBuf;
use hickory_resolver::Resolver;
use slog::{debug, o, warn, Logger};
use std::net::IpAddr;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Output;
use std::thread;

pub const LSBLK: &str = "/usr/bin/lsblk";
pub const LSCPU: &str = "/usr/bin/lscpu";
pub const PING: &str = "/usr/bin/ping";

/// Interfaces that never count as pod network ports.
const NON_PORT_INTERFACES: [&str; 2] = ["lo", "docker0"];

#[derive(thiserror::Error, Debug)]
pub enum ExecutionError {
    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        err: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Exited { command: String, status: ExitStatus, stderr: String },
}

fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `command` to completion. A non-zero exit is an error carrying the
/// command's stderr.
pub fn execute(command: &mut Command) -> Result<Output, ExecutionError> {
    let output = command.output().map_err(|err| ExecutionError::Spawn {
        command: describe(command),
        err,
    })?;
    if !output.status.success() {
        return Err(ExecutionError::Exited {
            command: describe(command),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("failed to read {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("could not parse {what} from {input:?}")]
    Parse { what: &'static str, input: String },

    #[error("failed to resolve {name}")]
    Resolve {
        name: String,
        #[source]
        err: hickory_resolver::error::ResolveError,
    },

    #[error("failed to create DNS resolver")]
    ResolverSetup(#[source] std::io::Error),
}

/// A per-interface attribute exposed under sysfs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterfaceAttribute {
    OperState,
    Carrier,
}

impl InterfaceAttribute {
    pub fn file_name(self) -> &'static str {
        match self {
            InterfaceAttribute::OperState => "operstate",
            InterfaceAttribute::Carrier => "carrier",
        }
    }
}

/// Facts about the running host.
///
/// Errors are returned to the caller, which decides the documented default
/// for the check in question.
pub trait HostProbe {
    /// Number of online logical CPUs.
    fn cpu_count(&self) -> Result<u64, ProbeError>;

    /// Installed memory in whole gigabytes.
    fn memory_gb(&self) -> Result<u64, ProbeError>;

    /// Sum of all disk sizes in whole gigabytes.
    fn storage_gb(&self) -> Result<u64, ProbeError>;

    /// Number of network interfaces, excluding loopback and docker.
    fn network_ports(&self) -> Result<u64, ProbeError>;

    fn interface_attribute(
        &self,
        interface: &str,
        attribute: InterfaceAttribute,
    ) -> Result<String, ProbeError>;

    /// Whether `addr` answers an ICMP echo.
    fn ping(&self, addr: IpAddr) -> Result<bool, ProbeError>;

    /// Whether `name` resolves to at least one address.
    fn resolve(&self, name: &str) -> Result<bool, ProbeError>;
}

/// [`HostProbe`] backed by the real system.
pub struct SystemProbe {
    log: Logger,
    config: ProbeConfig,
}

impl SystemProbe {
    pub fn new(log: &Logger, config: &ProbeConfig) -> Self {
        Self {
            log: log.new(o!("component" => "SystemProbe")),
            config: config.clone(),
        }
    }

    fn read(&self, path: Utf8PathBuf) -> Result<String, ProbeError> {
        std::fs::read_to_string(&path)
            .map_err(|err| ProbeError::Read { path, err })
    }

    fn ping_once(&self, addr: IpAddr) -> Result<bool, ProbeError> {
        let mut command = Command::new(PING);
        command
            .arg("-c")
            .arg("1")
            .arg("-W")
            .arg(self.config.ping_timeout_secs.to_string())
            .arg(addr.to_string());
        match execute(&mut command) {
            Ok(_) => Ok(true),
            // ping exits non-zero when there is no reply
            Err(ExecutionError::Exited { status, .. }) => {
                debug!(self.log, "no reply"; "addr" => %addr, "status" => %status);
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn parse_lscpu(output: &str) -> Result<u64, ProbeError> {
    output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "CPU(s)")
        .and_then(|(_, value)| value.trim().parse().ok())
        .ok_or_else(|| ProbeError::Parse {
            what: "CPU count",
            input: output.to_string(),
        })
}

fn parse_meminfo(contents: &str) -> Result<u64, ProbeError> {
    let kib: u64 = contents
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| ProbeError::Parse {
            what: "MemTotal",
            input: contents.to_string(),
        })?;
    Ok(kib / 1024 / 1024)
}

// Expects `lsblk -b -d -n -o SIZE,TYPE` output.
fn parse_lsblk(output: &str) -> Result<u64, ProbeError> {
    let mut bytes = 0u64;
    for line in output.lines() {
        let mut fields = line.split_whitespace();
        let (Some(size), Some(kind)) = (fields.next(), fields.next()) else {
            continue;
        };
        if kind != "disk" {
            continue;
        }
        let size: u64 = size.parse().map_err(|_| ProbeError::Parse {
            what: "disk size",
            input: line.to_string(),
        })?;
        bytes = bytes.saturating_add(size);
    }
    Ok(bytes / (1 << 30))
}

impl HostProbe for SystemProbe {
    fn cpu_count(&self) -> Result<u64, ProbeError> {
        let output = execute(&mut Command::new(LSCPU))?;
        parse_lscpu(&String::from_utf8_lossy(&output.stdout))
    }

    fn memory_gb(&self) -> Result<u64, ProbeError> {
        parse_meminfo(&self.read(self.config.meminfo_path.clone())?)
    }

    fn storage_gb(&self) -> Result<u64, ProbeError> {
        let mut command = Command::new(LSBLK);
        command.args(["-b", "-d", "-n", "-o", "SIZE,TYPE"]);
        let output = execute(&mut command)?;
        parse_lsblk(&String::from_utf8_lossy(&output.stdout))
    }

    fn network_ports(&self) -> Result<u64, ProbeError> {
        let dir = &self.config.sysfs_net_dir;
        let entries = dir
            .read_dir_utf8()
            .map_err(|err| ProbeError::Read { path: dir.clone(), err })?;
        let mut count = 0;
        for entry in entries {
            let entry =
                entry.map_err(|err| ProbeError::Read { path: dir.clone(), err })?;
            let name = entry.file_name();
            if !NON_PORT_INTERFACES.iter().any(|skip| *skip == name) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn interface_attribute(
        &self,
        interface: &str,
        attribute: InterfaceAttribute,
    ) -> Result<String, ProbeError> {
        let path = self
            .config
            .sysfs_net_dir
            .join(interface)
            .join(attribute.file_name());
        Ok(self.read(path)?.trim().to_string())
    }

    fn ping(&self, addr: IpAddr) -> Result<bool, ProbeError> {
        let attempts = self.config.ping_attempts.max(1);
        for attempt in 1..=attempts {
            if self.ping_once(addr)? {
                return Ok(true);
            }
            if attempt < attempts {
                thread::sleep(self.config.ping_interval());
            }
        }
        warn!(
            self.log,
            "host unreachable";
            "addr" => %addr,
            "attempts" => attempts,
        );
        Ok(false)
    }

    fn resolve(&self, name: &str) -> Result<bool, ProbeError> {
        let resolver =
            Resolver::from_system_conf().map_err(ProbeError::ResolverSetup)?;
        let response = resolver.lookup_ip(name).map_err(|err| {
            ProbeError::Resolve { name: name.to_string(), err }
        })?;
        Ok(response.iter().next().is_some())
    }
}

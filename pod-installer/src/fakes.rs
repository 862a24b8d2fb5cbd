// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A fake implementation of [`HostProbe`].
//!
//! [`FakeProbe`] answers from fixed values and avoids interacting with the
//! host OS. It counts every call so tests can assert which probes ran.

use crate::probe::HostProbe;
use crate::probe::InterfaceAttribute;
use crate::probe::ProbeError;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Mutex;

/// The kinds of probe a check can invoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProbeKind {
    CpuCount,
    MemoryGb,
    StorageGb,
    NetworkPorts,
    InterfaceAttribute,
    Ping,
    Resolve,
}

#[derive(Debug)]
pub struct FakeProbe {
    pub cpu_count: Option<u64>,
    pub memory_gb: Option<u64>,
    pub storage_gb: Option<u64>,
    pub network_ports: Option<u64>,
    /// `(interface, attribute)` to value; missing entries fail as if the
    /// sysfs file did not exist.
    pub interface_attributes: BTreeMap<(String, &'static str), String>,
    /// Addresses that do not answer pings. Everything else does.
    pub unreachable: BTreeSet<IpAddr>,
    pub resolves: bool,
    calls: Mutex<BTreeMap<ProbeKind, usize>>,
}

impl FakeProbe {
    /// A probe for which every check body is satisfied with the default
    /// thresholds.
    pub fn all_ok() -> FakeProbe {
        let mut interface_attributes = BTreeMap::new();
        for iface in ["public0", "mgmt0", "oob0", "private0", "inter0"] {
            interface_attributes.insert(
                (iface.to_string(), InterfaceAttribute::OperState.file_name()),
                "up".to_string(),
            );
            interface_attributes.insert(
                (iface.to_string(), InterfaceAttribute::Carrier.file_name()),
                "1".to_string(),
            );
        }
        FakeProbe {
            cpu_count: Some(32),
            memory_gb: Some(64),
            storage_gb: Some(960),
            network_ports: Some(6),
            interface_attributes,
            unreachable: BTreeSet::new(),
            resolves: true,
            calls: Mutex::new(BTreeMap::new()),
        }
    }

    /// A probe for which every call errors.
    pub fn all_failing() -> FakeProbe {
        FakeProbe {
            cpu_count: None,
            memory_gb: None,
            storage_gb: None,
            network_ports: None,
            interface_attributes: BTreeMap::new(),
            unreachable: BTreeSet::new(),
            resolves: false,
            calls: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn calls(&self, kind: ProbeKind) -> usize {
        self.calls.lock().unwrap().get(&kind).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn record(&self, kind: ProbeKind) {
        *self.calls.lock().unwrap().entry(kind).or_default() += 1;
    }

    fn value(
        &self,
        kind: ProbeKind,
        value: Option<u64>,
        what: &'static str,
    ) -> Result<u64, ProbeError> {
        self.record(kind);
        value.ok_or(ProbeError::Parse { what, input: String::new() })
    }
}

impl HostProbe for FakeProbe {
    fn cpu_count(&self) -> Result<u64, ProbeError> {
        self.value(ProbeKind::CpuCount, self.cpu_count, "CPU count")
    }

    fn memory_gb(&self) -> Result<u64, ProbeError> {
        self.value(ProbeKind::MemoryGb, self.memory_gb, "MemTotal")
    }

    fn storage_gb(&self) -> Result<u64, ProbeError> {
        self.value(ProbeKind::StorageGb, self.storage_gb, "disk size")
    }

    fn network_ports(&self) -> Result<u64, ProbeError> {
        self.value(ProbeKind::NetworkPorts, self.network_ports, "ports")
    }

    fn interface_attribute(
        &self,
        interface: &str,
        attribute: InterfaceAttribute,
    ) -> Result<String, ProbeError> {
        self.record(ProbeKind::InterfaceAttribute);
        self.interface_attributes
            .get(&(interface.to_string(), attribute.file_name()))
            .cloned()
            .ok_or_else(|| ProbeError::Read {
                path: format!("/sys/class/net/{interface}")
                    .into(),
                err: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }

    fn ping(&self, addr: IpAddr) -> Result<bool, ProbeError> {
        self.record(ProbeKind::Ping);
        Ok(!self.unreachable.contains(&addr))
    }

    fn resolve(&self, _name: &str) -> Result<bool, ProbeError> {
        self.record(ProbeKind::Resolve);
        Ok(self.resolves)
    }
}

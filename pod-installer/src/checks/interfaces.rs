// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-interface link and naming checks.

use super::lacks_region_flavor;
use crate::probe::InterfaceAttribute;
use crate::registry::{CheckContext, CheckDefinition, Evaluation};

const NOT_FOUND: &str = "Not Found";

struct Interface {
    /// Name netplan gives the interface.
    name: &'static str,
    /// Key fragment of the `<host>_<key>_ifname` entry in `config.json`.
    config_key: &'static str,
    codes: [&'static str; 3],
    /// Only present when the blend has the region capability.
    region_only: bool,
}

const INTERFACES: [Interface; 5] = [
    Interface {
        name: "public0",
        config_key: "public",
        codes: ["2.1.1", "2.1.2", "2.1.3"],
        region_only: false,
    },
    Interface {
        name: "mgmt0",
        config_key: "mgmt",
        codes: ["2.2.1", "2.2.2", "2.2.3"],
        region_only: false,
    },
    Interface {
        name: "oob0",
        config_key: "oob",
        codes: ["2.3.1", "2.3.2", "2.3.3"],
        region_only: false,
    },
    Interface {
        name: "private0",
        config_key: "private",
        codes: ["2.4.1", "2.4.2", "2.4.3"],
        region_only: true,
    },
    Interface {
        name: "inter0",
        config_key: "inter",
        codes: ["2.5.1", "2.5.2", "2.5.3"],
        region_only: true,
    },
];

fn attribute(
    cx: &CheckContext<'_>,
    name: &str,
    attribute: InterfaceAttribute,
) -> String {
    cx.degrade(
        attribute.file_name(),
        cx.probe.interface_attribute(name, attribute),
        NOT_FOUND.to_string(),
    )
}

/// The interface `config.json` names for this host must be the one netplan
/// renames to `name`.
fn ethernet_name(
    cx: &CheckContext<'_>,
    name: &str,
    config_key: &str,
) -> Evaluation {
    let hostname = cx.snapshots.infra.hostname.trim();
    let configured = cx
        .snapshots
        .metadata
        .config
        .ifname(hostname, config_key)
        .valid()
        .cloned()
        .unwrap_or_default();
    let renamed = cx
        .snapshots
        .infra
        .netplan
        .ethernet_renamed_to(name)
        .unwrap_or(NOT_FOUND);
    if configured == renamed {
        Evaluation::met(format!("Ethernet Name Match ({renamed})"))
    } else {
        Evaluation::unmet(format!(
            "Ethernet Name = {configured:?}, netplan = {renamed:?}"
        ))
    }
}

pub(super) fn checks() -> Vec<CheckDefinition> {
    let mut checks = Vec::new();
    for (n, iface) in INTERFACES.iter().enumerate() {
        let base = 5 + 3 * n as u16;
        let name = iface.name;
        let config_key = iface.config_key;
        let title = format!("Hardware {name}");
        let mut block = vec![
            CheckDefinition::new(base, iface.codes[0], &title, move |cx| {
                let state = attribute(cx, name, InterfaceAttribute::OperState);
                Evaluation::new(state == "up", format!("Operstate = {state}"))
            }),
            CheckDefinition::new(base + 1, iface.codes[1], &title, move |cx| {
                let carrier = attribute(cx, name, InterfaceAttribute::Carrier);
                Evaluation::new(carrier == "1", format!("Carrier = {carrier}"))
            }),
            CheckDefinition::new(base + 2, iface.codes[2], &title, move |cx| {
                ethernet_name(cx, name, config_key)
            }),
        ];
        if iface.region_only {
            block = block
                .into_iter()
                .map(|check| check.skip_when(lacks_region_flavor))
                .collect();
        }
        checks.extend(block);
    }
    checks
}

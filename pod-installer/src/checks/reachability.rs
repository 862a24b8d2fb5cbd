// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Upstream reachability checks.

use crate::registry::{CheckContext, CheckDefinition, Evaluation};
use pod_installer_common::snapshot::{Field, PodConfig};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

pub const GOOGLE_DNS_V4: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);
pub const GOOGLE_DNS_V6: Ipv6Addr =
    Ipv6Addr::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888);
pub const DNS_PROBE_NAME: &str = "google.com";

fn ping(cx: &CheckContext<'_>, addr: IpAddr) -> Evaluation {
    if cx.degrade("ping", cx.probe.ping(addr), false) {
        Evaluation::met(format!("{addr} is reachable"))
    } else {
        Evaluation::unmet(format!("{addr} is unreachable"))
    }
}

/// Pings an address from `config.json`. An address that is not configured
/// fails without probing.
fn ping_configured<A>(
    cx: &CheckContext<'_>,
    field: fn(&PodConfig) -> &Field<A>,
) -> Evaluation
where
    A: Copy + Into<IpAddr>,
{
    match field(&cx.snapshots.metadata.config) {
        Field::Valid(addr) => ping(cx, (*addr).into()),
        Field::Invalid(raw) => {
            Evaluation::unmet(format!("{raw} is not a valid address"))
        }
        Field::Absent => Evaluation::unmet("address not configured"),
    }
}

pub(super) fn checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::new(83, "5.1.1", "Ping IPv4 Link PE", |cx| {
            ping_configured(cx, |c| &c.ipv4_link_pe)
        }),
        CheckDefinition::new(84, "5.1.2", "Ping IPv4 Link CPE", |cx| {
            ping_configured(cx, |c| &c.ipv4_link_cpe)
        }),
        CheckDefinition::new(85, "5.1.3", "Ping IPv4 Google DNS", |cx| {
            ping(cx, GOOGLE_DNS_V4.into())
        }),
        CheckDefinition::new(86, "5.2.1", "Ping IPv6 Link PE", |cx| {
            ping_configured(cx, |c| &c.ipv6_link_pe)
        }),
        CheckDefinition::new(87, "5.2.2", "Ping IPv6 Link CPE", |cx| {
            ping_configured(cx, |c| &c.ipv6_link_cpe)
        }),
        CheckDefinition::new(88, "5.2.3", "Ping IPv6 Google DNS", |cx| {
            ping(cx, GOOGLE_DNS_V6.into())
        }),
        CheckDefinition::new(89, "5.3.1", "DNS Resolution", |cx| {
            if cx.degrade("resolve", cx.probe.resolve(DNS_PROBE_NAME), false) {
                Evaluation::met(format!("{DNS_PROBE_NAME} resolves"))
            } else {
                Evaluation::unmet(format!("{DNS_PROBE_NAME} does not resolve"))
            }
        }),
    ]
}

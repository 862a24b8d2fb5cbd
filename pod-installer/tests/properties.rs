// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property based tests for the check runner's classification.
//!
//! Each case generates a host (blend, hostname, media) and arbitrary probe
//! results, runs the standard validator, and verifies that the outcome
//! bitmaps partition the registry the way the selected policy demands.

mod common;

use common::{snapshots, validator, with_media};
use pod_installer::fakes::FakeProbe;
use pod_installer::probe::InterfaceAttribute;
use pod_installer::session::{MemorySessionStore, SessionStore};
use pod_installer_common::TestBitmap;
use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const INTERFACES: [&str; 5] = ["public0", "mgmt0", "oob0", "private0", "inter0"];

#[derive(Clone, Debug)]
struct Host {
    blend: i64,
    hostname: &'static str,
    media: Option<bool>,
}

#[derive(Clone, Debug)]
struct ProbeResults {
    cpu_count: Option<u64>,
    memory_gb: Option<u64>,
    storage_gb: Option<u64>,
    network_ports: Option<u64>,
    /// Per interface: operstate up, carrier up.
    links: Vec<(bool, bool)>,
    unreachable: Vec<bool>,
    resolves: bool,
}

fn arb_host() -> impl Strategy<Value = Host> {
    (
        prop::sample::select(vec![0i64, 2, 3, 4, 6, 7]),
        prop::sample::select(vec![
            "podnet-a",
            "podnet-b",
            "appliance-a",
            "mystery-node",
        ]),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(blend, hostname, media)| Host { blend, hostname, media })
}

fn arb_probe_results() -> impl Strategy<Value = ProbeResults> {
    (
        prop::option::of(0u64..64),
        prop::option::of(0u64..32),
        prop::option::of(0u64..1000),
        prop::option::of(0u64..8),
        prop::collection::vec((any::<bool>(), any::<bool>()), 5),
        prop::collection::vec(any::<bool>(), 6),
        any::<bool>(),
    )
        .prop_map(
            |(
                cpu_count,
                memory_gb,
                storage_gb,
                network_ports,
                links,
                unreachable,
                resolves,
            )| ProbeResults {
                cpu_count,
                memory_gb,
                storage_gb,
                network_ports,
                links,
                unreachable,
                resolves,
            },
        )
}

fn probe(results: &ProbeResults) -> FakeProbe {
    let mut probe = FakeProbe::all_ok();
    probe.cpu_count = results.cpu_count;
    probe.memory_gb = results.memory_gb;
    probe.storage_gb = results.storage_gb;
    probe.network_ports = results.network_ports;
    for (iface, (up, carrier)) in INTERFACES.iter().zip(&results.links) {
        let operstate = if *up { "up" } else { "down" };
        let carrier = if *carrier { "1" } else { "0" };
        probe.interface_attributes.insert(
            (iface.to_string(), InterfaceAttribute::OperState.file_name()),
            operstate.to_string(),
        );
        probe.interface_attributes.insert(
            (iface.to_string(), InterfaceAttribute::Carrier.file_name()),
            carrier.to_string(),
        );
    }
    let addrs: [IpAddr; 6] = [
        Ipv4Addr::new(91, 103, 0, 1).into(),
        Ipv4Addr::new(91, 103, 0, 2).into(),
        Ipv4Addr::new(8, 8, 8, 8).into(),
        "2a02:2078:9::1".parse::<Ipv6Addr>().unwrap().into(),
        "2a02:2078:9::2".parse::<Ipv6Addr>().unwrap().into(),
        "2001:4860:4860::8888".parse::<Ipv6Addr>().unwrap().into(),
    ];
    for (addr, unreachable) in addrs.iter().zip(&results.unreachable) {
        if *unreachable {
            probe.unreachable.insert(*addr);
        }
    }
    probe.resolves = results.resolves;
    probe
}

fn disjoint(maps: &[TestBitmap]) -> bool {
    maps.iter().enumerate().all(|(i, a)| {
        maps[i + 1..].iter().all(|b| a.is_disjoint(b))
    })
}

proptest! {
    #[test]
    fn test_outcomes_partition_registry(
        host in arb_host(),
        results in arb_probe_results(),
    ) {
        let validator = validator();
        let mut snapshots = snapshots(host.hostname, host.blend);
        if let Some(podnet_b_enabled) = host.media {
            snapshots = with_media(snapshots, podnet_b_enabled);
        }
        let probe = probe(&results);
        let mut store = MemorySessionStore::new();
        let blob = validator.run(&mut store, snapshots.clone(), &probe).unwrap();
        let details = store.test_details().unwrap();
        let outcomes = &details.outcomes;
        let levels = &details.levels;
        let full = TestBitmap::full(validator.registry().width());

        prop_assert!(disjoint(&[
            outcomes.pass,
            outcomes.warn,
            outcomes.fail,
            outcomes.ignore,
        ]));
        // The authored policy has no gaps, so every check is classified.
        prop_assert_eq!(
            outcomes.pass | outcomes.warn | outcomes.fail | outcomes.ignore,
            full
        );
        prop_assert_eq!(levels.ignore, (levels.warn | levels.fail) ^ full);
        prop_assert!(outcomes.warn.difference(&levels.warn).is_empty());
        prop_assert!(outcomes.fail.difference(&levels.fail).is_empty());
        prop_assert!(levels.ignore.difference(&outcomes.ignore).is_empty());
        prop_assert!(blob.results.iter().all(|r| !r.is_empty()));

        if blob.host_status.is_unknown() {
            prop_assert!(blob.fail_bitmap.is_full());
            prop_assert_eq!(probe.total_calls(), 0);
        }

        // Same inputs, same blob.
        let probe = self::probe(&results);
        let again = validator.run(&mut store, snapshots, &probe).unwrap();
        prop_assert_eq!(blob, again);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimum hardware checks.

use crate::config::Thresholds;
use crate::probe::{HostProbe, ProbeError};
use crate::registry::{CheckContext, CheckDefinition, Evaluation};

fn at_least(
    cx: &CheckContext<'_>,
    probe: &'static str,
    read: fn(&dyn HostProbe) -> Result<u64, ProbeError>,
    min: u64,
    unit: &'static str,
) -> Evaluation {
    let count = cx.degrade(probe, read(cx.probe), 0);
    Evaluation::new(count >= min, format!("Count = {count}{unit}"))
}

pub(super) fn checks(thresholds: &Thresholds) -> Vec<CheckDefinition> {
    let t = *thresholds;
    vec![
        CheckDefinition::new(0, "1.1.1", "Hardware CPU-Core Count", move |cx| {
            at_least(cx, "cpu_count", |p| p.cpu_count(), t.cores_min, "")
        }),
        CheckDefinition::new(1, "1.2.1", "Hardware RAM Count", move |cx| {
            at_least(cx, "memory_gb", |p| p.memory_gb(), t.ram_min_gb, "GB")
        }),
        CheckDefinition::new(2, "1.3.1", "Hardware Storage", move |cx| {
            at_least(
                cx,
                "storage_gb",
                |p| p.storage_gb(),
                t.storage_min_gb,
                "GB",
            )
        }),
        CheckDefinition::new(3, "1.4.1", "Hardware PodNet Ports", move |cx| {
            at_least(
                cx,
                "network_ports",
                |p| p.network_ports(),
                t.podnet_ports_min,
                "",
            )
        }),
        CheckDefinition::new(
            4,
            "1.4.2",
            "Hardware Appliance Ports",
            move |cx| {
                at_least(
                    cx,
                    "network_ports",
                    |p| p.network_ports(),
                    t.appliance_ports_min,
                    "",
                )
            },
        ),
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fakes::FakeProbe;
    use pod_installer_common::snapshot::Snapshots;
    use slog::{o, Logger};

    #[test]
    fn test_thresholds_and_degraded_defaults() {
        let log = Logger::root(slog::Discard, o!());
        let snapshots = Snapshots::default();
        let checks = checks(&Thresholds::default());

        let mut probe = FakeProbe::all_ok();
        probe.cpu_count = Some(20);
        probe.memory_gb = Some(7);
        let cx = CheckContext { log: &log, snapshots: &snapshots, probe: &probe };
        assert_eq!(checks[0].evaluate(&cx), Evaluation::met("Count = 20"));
        assert_eq!(checks[1].evaluate(&cx), Evaluation::unmet("Count = 7GB"));
        assert!(checks[2].evaluate(&cx).met);

        let probe = FakeProbe::all_failing();
        let cx = CheckContext { log: &log, snapshots: &snapshots, probe: &probe };
        for check in &checks {
            let evaluation = check.evaluate(&cx);
            assert!(!evaluation.met, "{}", check.code());
            assert!(evaluation.detail.starts_with("Count = 0"));
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Executes the registry against the session.

use crate::probe::HostProbe;
use crate::registry::{CheckContext, CheckDefinition, CheckRegistry, Verdict};
use crate::session::{SessionError, SessionStore};
use pod_installer_common::TestBitmap;
use slog::{debug, o, warn, Logger};

pub struct CheckRunner<'a> {
    log: Logger,
    registry: &'a CheckRegistry,
}

impl<'a> CheckRunner<'a> {
    pub fn new(log: &Logger, registry: &'a CheckRegistry) -> Self {
        Self { log: log.new(o!("component" => "CheckRunner")), registry }
    }

    /// Runs every check once, in registry order, against the policy levels
    /// already stored in the session.
    ///
    /// If the session's host status is unresolved no check body runs: every
    /// check fails with the same message.
    pub fn run_all(
        &self,
        store: &mut dyn SessionStore,
        probe: &dyn HostProbe,
    ) -> Result<(), SessionError> {
        if store.host_status()?.is_unknown() {
            return self.fail_unresolved(store);
        }
        for check in self.registry.iter() {
            self.run_check(store, probe, check)?;
        }
        Ok(())
    }

    fn fail_unresolved(
        &self,
        store: &mut dyn SessionStore,
    ) -> Result<(), SessionError> {
        let width = self.registry.width();
        let mut details = store.test_details()?;
        details.outcomes.pass = TestBitmap::empty(width);
        details.outcomes.warn = TestBitmap::empty(width);
        details.outcomes.ignore = TestBitmap::empty(width);
        details.outcomes.fail = TestBitmap::full(width);
        details.results =
            self.registry.iter().map(|c| c.unresolved_message()).collect();
        warn!(
            self.log,
            "host status unresolved, failing every check";
            "checks" => width,
        );
        store.set_test_details(details)
    }

    /// Applies the classification protocol to one check and writes the
    /// outcome back to the store.
    fn run_check(
        &self,
        store: &mut dyn SessionStore,
        probe: &dyn HostProbe,
        check: &CheckDefinition,
    ) -> Result<(), SessionError> {
        let mut details = store.test_details()?;
        let id = check.id();
        let snapshots = store.snapshots()?;

        if details.levels.ignore.test(id) || check.skipped(snapshots) {
            details.outcomes.ignore.set(id);
            details.results[id.index()] = check.ignore_message();
            debug!(self.log, "check ignored"; "id" => %id, "code" => check.code());
            return store.set_test_details(details);
        }

        let cx = CheckContext { log: &self.log, snapshots, probe };
        let evaluation = check.evaluate(&cx);
        let verdict = if evaluation.met {
            details.outcomes.pass.set(id);
            Verdict::Pass
        } else if details.levels.fail.test(id) {
            details.outcomes.fail.set(id);
            Verdict::Fail
        } else if details.levels.warn.test(id) {
            details.outcomes.warn.set(id);
            Verdict::Warn
        } else {
            warn!(
                self.log,
                "policy gap: failed check is neither warn nor fail";
                "id" => %id,
                "code" => check.code(),
                "detail" => &evaluation.detail,
            );
            Verdict::Unclassified
        };
        debug!(
            self.log,
            "check complete";
            "id" => %id,
            "code" => check.code(),
            "verdict" => verdict.as_str(),
        );
        details.results[id.index()] =
            check.message(verdict, &evaluation.detail);
        store.set_test_details(details)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fakes::{FakeProbe, ProbeKind};
    use crate::policy::{audit, PolicyDefect, PolicyLevels};
    use crate::registry::{CheckDefinition, Evaluation};
    use crate::session::MemorySessionStore;
    use pod_installer_common::host_status::{Blend, HostProfile, Role, Stage};
    use pod_installer_common::snapshot::Snapshots;
    use pod_installer_common::{HostStatus, TestId};

    const WIDTH: u32 = 4;

    /// Check `i` pings nothing but records a probe call, and is met unless
    /// its bit is in `failing`.
    fn registry(failing: u128) -> CheckRegistry {
        let checks = (0..WIDTH as u16)
            .map(|i| {
                CheckDefinition::new(i, "9.1.1", format!("Check {i}"), move |cx| {
                    let _ = cx.probe.resolve("example.com");
                    Evaluation::new(failing & (1 << i) == 0, "detail")
                })
            })
            .collect();
        CheckRegistry::new(checks).unwrap()
    }

    fn store_with(levels: PolicyLevels) -> MemorySessionStore {
        let mut store = MemorySessionStore::new();
        store.reset(Snapshots::default(), WIDTH).unwrap();
        store
            .set_host_status(HostStatus::Known(
                HostProfile::new(Blend::Cop, Role::PodnetA, Stage::Validate)
                    .unwrap(),
            ))
            .unwrap();
        let mut details = store.test_details().unwrap();
        details.levels = levels;
        store.set_test_details(details).unwrap();
        store
    }

    fn bits(value: u128) -> TestBitmap {
        TestBitmap::from_bits(WIDTH, value).unwrap()
    }

    fn log() -> Logger {
        Logger::root(slog::Discard, o!())
    }

    #[test]
    fn test_classification() {
        // 0 warn, 1 fail, 2 fail, 3 ignore; 0 and 1 fail their predicate.
        let levels = PolicyLevels::from_parts(bits(0b0001), bits(0b0110));
        let mut store = store_with(levels);
        let registry = registry(0b1011);
        let probe = FakeProbe::all_ok();
        CheckRunner::new(&log(), &registry).run_all(&mut store, &probe).unwrap();

        let details = store.test_details().unwrap();
        assert_eq!(details.outcomes.warn, bits(0b0001));
        assert_eq!(details.outcomes.fail, bits(0b0010));
        assert_eq!(details.outcomes.pass, bits(0b0100));
        assert_eq!(details.outcomes.ignore, bits(0b1000));
        assert_eq!(
            details.results,
            vec![
                "9.1.1 Check 0 - Warn - detail",
                "9.1.1 Check 1 - Fail - detail",
                "9.1.1 Check 2 - Pass - detail",
                "9.1.1 Check 3 - Ignore",
            ]
        );
        // The ignored check never ran its probe.
        assert_eq!(probe.calls(ProbeKind::Resolve), 3);
    }

    #[test]
    fn test_policy_gap_is_reported_not_raised() {
        // Check 2 is in no class at all.
        let levels = PolicyLevels {
            warn: bits(0b0001),
            fail: bits(0b0010),
            ignore: bits(0b1000),
        };
        let mut store = store_with(levels);
        let registry = registry(0b0100);
        let probe = FakeProbe::all_ok();
        CheckRunner::new(&log(), &registry).run_all(&mut store, &probe).unwrap();

        let details = store.test_details().unwrap();
        let id = TestId::new(2);
        for map in [
            details.outcomes.pass,
            details.outcomes.warn,
            details.outcomes.fail,
            details.outcomes.ignore,
        ] {
            assert!(!map.test(id));
        }
        assert_eq!(
            details.results[2],
            "9.1.1 Check 2 - Unclassified - detail"
        );
        assert_eq!(audit(&levels), vec![PolicyDefect::Gap(id)]);
    }

    #[test]
    fn test_unresolved_fails_everything_without_probing() {
        let mut store = MemorySessionStore::new();
        store.reset(Snapshots::default(), WIDTH).unwrap();
        let mut details = store.test_details().unwrap();
        details.levels = PolicyLevels::fail_everything(WIDTH);
        store.set_test_details(details).unwrap();

        let registry = registry(0);
        let probe = FakeProbe::all_ok();
        CheckRunner::new(&log(), &registry).run_all(&mut store, &probe).unwrap();

        let details = store.test_details().unwrap();
        assert!(details.outcomes.fail.is_full());
        assert!(details.outcomes.pass.is_empty());
        assert_eq!(probe.total_calls(), 0);
        assert!(details
            .results
            .iter()
            .all(|r| r.ends_with(" - Fail - host status unresolved")));
    }

    #[test]
    fn test_input_data_skip() {
        let levels = PolicyLevels::from_parts(bits(0), bits(0b1111));
        let mut store = store_with(levels);
        let checks = (0..WIDTH as u16)
            .map(|i| {
                let check = CheckDefinition::new(i, "9.1.1", "Check", |cx| {
                    let _ = cx.probe.ping([127, 0, 0, 1].into());
                    Evaluation::met("")
                });
                if i == 3 {
                    check.skip_when(|_| true)
                } else {
                    check
                }
            })
            .collect();
        let registry = CheckRegistry::new(checks).unwrap();
        let probe = FakeProbe::all_ok();
        CheckRunner::new(&log(), &registry).run_all(&mut store, &probe).unwrap();

        let details = store.test_details().unwrap();
        assert_eq!(details.outcomes.pass, bits(0b0111));
        assert_eq!(details.outcomes.ignore, bits(0b1000));
        assert_eq!(probe.calls(ProbeKind::Ping), 3);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-host-status policy table.
//!
//! For every legal [`HostProfile`] the table names the checks whose failure
//! is only a warning and the checks whose failure blocks provisioning. Every
//! other check is ignored for that host status. The authored vectors are
//! data, not computed; [`PolicyTable::new`] verifies them before any check
//! runs.

use pod_installer_common::host_status::{Blend, HostProfile, Role, Stage};
use pod_installer_common::{HostStatus, TestBitmap, TestId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// One authored row of the policy table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolicyEntry {
    pub blend: Blend,
    pub role: Role,
    pub stage: Stage,
    pub warn: u128,
    pub fail: u128,
}

const fn entry(
    blend: Blend,
    role: Role,
    stage: Stage,
    warn: u128,
    fail: u128,
) -> PolicyEntry {
    PolicyEntry { blend, role, stage, warn, fail }
}

/// Warn and fail vectors for every legal host status, one bit per check.
///
/// Bit 19 (the `inter0` ethernet name) is a failure, not a warning, for
/// region-flavoured secondary nodes being validated.
pub const AUTHORED_POLICY: &[PolicyEntry] = &[
    entry(
        Blend::Cop,
        Role::PodnetA,
        Stage::Validate,
        0x1,
        0x3f8_0000_0000_7fff_fae0_3fee,
    ),
    entry(
        Blend::Cop,
        Role::PodnetA,
        Stage::Install,
        0x10_0001,
        0x3f8_0000_0000_7fff_e5e0_006e,
    ),
    entry(
        Blend::Cop,
        Role::PodnetA,
        Stage::Reinstall,
        0x18_0001,
        0x3f8_0000_0000_7fff_e5e0_030e,
    ),
    entry(
        Blend::Cop,
        Role::PodnetB,
        Stage::Validate,
        0x18_0001,
        0x3f8_0000_0000_7fff_fae0_3fee,
    ),
    entry(
        Blend::Cop,
        Role::PodnetB,
        Stage::Install,
        0x18_0001,
        0x3f8_0000_0000_7fff_e5e0_030e,
    ),
    entry(
        Blend::Cop,
        Role::ApplianceA,
        Stage::Validate,
        0x18_0001,
        0x330_0fff_ffff_f800_9ae0_0716,
    ),
    entry(
        Blend::Cop,
        Role::ApplianceA,
        Stage::Install,
        0x18_0001,
        0x330_0fff_ffff_f800_85e0_0316,
    ),
    entry(
        Blend::Region,
        Role::PodnetA,
        Stage::Validate,
        0x1,
        0x3f8_0000_0000_7fff_faef_ffee,
    ),
    entry(
        Blend::Region,
        Role::PodnetA,
        Stage::Install,
        0x10_0001,
        0x3f8_0000_0000_7fff_e5e0_006e,
    ),
    entry(
        Blend::Region,
        Role::PodnetA,
        Stage::Reinstall,
        0x18_0001,
        0x3f8_0000_0000_7fff_e5e0_030e,
    ),
    entry(
        Blend::Region,
        Role::PodnetB,
        Stage::Validate,
        0x10_0001,
        0x3f8_0000_0000_7fff_faef_ffee,
    ),
    entry(
        Blend::Region,
        Role::PodnetB,
        Stage::Install,
        0x18_0001,
        0x3f8_0000_0000_7fff_e5e0_030e,
    ),
    entry(
        Blend::Region,
        Role::ApplianceA,
        Stage::Validate,
        0x18_0001,
        0x337_f003_ffff_f800_9ae0_0716,
    ),
    entry(
        Blend::Region,
        Role::ApplianceA,
        Stage::Install,
        0x18_0001,
        0x337_f003_ffff_f800_85e0_0316,
    ),
    entry(
        Blend::CopRegion,
        Role::PodnetA,
        Stage::Validate,
        0x1,
        0x3f8_0000_0000_7fff_faef_ffee,
    ),
    entry(
        Blend::CopRegion,
        Role::PodnetA,
        Stage::Install,
        0x10_0001,
        0x3f8_0000_0000_7fff_e5e0_006e,
    ),
    entry(
        Blend::CopRegion,
        Role::PodnetA,
        Stage::Reinstall,
        0x18_0001,
        0x3f8_0000_0000_7fff_e5e0_030e,
    ),
    entry(
        Blend::CopRegion,
        Role::PodnetB,
        Stage::Validate,
        0x10_0001,
        0x3f8_0000_0000_7fff_faef_ffee,
    ),
    entry(
        Blend::CopRegion,
        Role::PodnetB,
        Stage::Install,
        0x18_0001,
        0x3f8_0000_0000_7fff_e5e0_030e,
    ),
    entry(
        Blend::CopRegion,
        Role::ApplianceA,
        Stage::Validate,
        0x18_0001,
        0x337_f003_ffff_f800_9ae0_0716,
    ),
    entry(
        Blend::CopRegion,
        Role::ApplianceA,
        Stage::Install,
        0x18_0001,
        0x337_f003_ffff_f800_85e0_0316,
    ),
    entry(
        Blend::Pat,
        Role::PodnetA,
        Stage::Validate,
        0x1,
        0x3f8_0000_0000_7fff_faef_ffee,
    ),
    entry(
        Blend::Pat,
        Role::PodnetA,
        Stage::Install,
        0x10_0001,
        0x3f8_0000_0000_7fff_e5e0_006e,
    ),
    entry(
        Blend::Pat,
        Role::PodnetA,
        Stage::Reinstall,
        0x18_0001,
        0x3f8_0000_0000_7fff_e5e0_030e,
    ),
    entry(
        Blend::Pat,
        Role::PodnetB,
        Stage::Validate,
        0x10_0001,
        0x3f8_0000_0000_7fff_faef_ffee,
    ),
    entry(
        Blend::Pat,
        Role::PodnetB,
        Stage::Install,
        0x18_0001,
        0x3f8_0000_0000_7fff_e5e0_030e,
    ),
    entry(
        Blend::Pat,
        Role::ApplianceA,
        Stage::Validate,
        0x18_0001,
        0x337_f003_ffff_f800_9ae0_0716,
    ),
    entry(
        Blend::Pat,
        Role::ApplianceA,
        Stage::Install,
        0x18_0001,
        0x337_f003_ffff_f800_85e0_0316,
    ),
];

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("no policy entry for host status {0}")]
    Missing(HostProfile),

    #[error("more than one policy entry for host status {0}")]
    Duplicate(HostProfile),

    #[error("policy entry names illegal host status {blend}/{role}/{stage}")]
    IllegalProfile { blend: Blend, role: Role, stage: Stage },

    #[error("policy for {profile} sets bits beyond width {width}")]
    TooWide { profile: HostProfile, width: u32 },

    #[error("policy for {profile} classifies checks {ids:?} as both warn and fail")]
    Overlap { profile: HostProfile, ids: Vec<TestId> },
}

/// The three pre-declared classes for one host status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyLevels {
    pub warn: TestBitmap,
    pub fail: TestBitmap,
    pub ignore: TestBitmap,
}

impl PolicyLevels {
    pub fn empty(width: u32) -> Self {
        Self {
            warn: TestBitmap::empty(width),
            fail: TestBitmap::empty(width),
            ignore: TestBitmap::empty(width),
        }
    }

    /// Derives `ignore` as every bit that is neither warn nor fail.
    pub fn from_parts(warn: TestBitmap, fail: TestBitmap) -> Self {
        let ignore = (warn | fail) ^ TestBitmap::full(warn.width());
        Self { warn, fail, ignore }
    }

    /// Levels used when the host status could not be resolved: every check
    /// fails.
    pub fn fail_everything(width: u32) -> Self {
        Self {
            warn: TestBitmap::empty(width),
            fail: TestBitmap::full(width),
            ignore: TestBitmap::empty(width),
        }
    }

    pub fn width(&self) -> u32 {
        self.fail.width()
    }
}

/// A consistency defect in a set of [`PolicyLevels`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyDefect {
    /// The check is in none of warn, fail or ignore.
    Gap(TestId),
    /// The check is in more than one class.
    Overlap { id: TestId, classes: Vec<&'static str> },
}

impl std::fmt::Display for PolicyDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyDefect::Gap(id) => {
                write!(f, "test {id} is not classified as warn, fail or ignore")
            }
            PolicyDefect::Overlap { id, classes } => {
                write!(f, "test {id} is classified as {}", classes.join(" and "))
            }
        }
    }
}

/// Reports every check that is unclassified or classified more than once.
pub fn audit(levels: &PolicyLevels) -> Vec<PolicyDefect> {
    let classes = [
        ("warn", &levels.warn),
        ("fail", &levels.fail),
        ("ignore", &levels.ignore),
    ];
    (0..levels.width())
        .map(|i| TestId::new(i as u16))
        .filter_map(|id| {
            let set: Vec<&'static str> = classes
                .iter()
                .filter(|(_, map)| map.test(id))
                .map(|(name, _)| *name)
                .collect();
            match set.len() {
                0 => Some(PolicyDefect::Gap(id)),
                1 => None,
                _ => Some(PolicyDefect::Overlap { id, classes: set }),
            }
        })
        .collect()
}

/// The validated policy table for a registry of a given width.
#[derive(Clone, Debug)]
pub struct PolicyTable {
    width: u32,
    entries: BTreeMap<HostProfile, (TestBitmap, TestBitmap)>,
}

impl PolicyTable {
    /// Builds a table from authored rows, requiring exactly one row per legal
    /// host status, vectors that fit `width`, and disjoint warn and fail.
    pub fn new(
        width: u32,
        rows: &[PolicyEntry],
    ) -> Result<PolicyTable, PolicyError> {
        let mut entries = BTreeMap::new();
        for row in rows {
            let profile = HostProfile::new(row.blend, row.role, row.stage)
                .ok_or(PolicyError::IllegalProfile {
                    blend: row.blend,
                    role: row.role,
                    stage: row.stage,
                })?;
            let too_wide = || PolicyError::TooWide { profile, width };
            let warn =
                TestBitmap::from_bits(width, row.warn).map_err(|_| too_wide())?;
            let fail =
                TestBitmap::from_bits(width, row.fail).map_err(|_| too_wide())?;
            let both = warn & fail;
            if !both.is_empty() {
                return Err(PolicyError::Overlap {
                    profile,
                    ids: both.iter().collect(),
                });
            }
            if entries.insert(profile, (warn, fail)).is_some() {
                return Err(PolicyError::Duplicate(profile));
            }
        }
        if let Some(missing) =
            HostProfile::all().find(|p| !entries.contains_key(p))
        {
            return Err(PolicyError::Missing(missing));
        }
        Ok(PolicyTable { width, entries })
    }

    /// The authored table.
    pub fn standard(width: u32) -> Result<PolicyTable, PolicyError> {
        Self::new(width, AUTHORED_POLICY)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Selects the levels for `status`. An unresolved or unmapped status
    /// fails every check.
    pub fn lookup(&self, status: &HostStatus) -> PolicyLevels {
        status
            .profile()
            .and_then(|profile| self.entries.get(profile))
            .map(|(warn, fail)| PolicyLevels::from_parts(*warn, *fail))
            .unwrap_or_else(|| PolicyLevels::fail_everything(self.width))
    }

    /// Whether `profile` has an entry.
    pub fn contains(&self, profile: &HostProfile) -> bool {
        self.entries.contains_key(profile)
    }

    /// Audits the levels of every row.
    pub fn audit(&self) -> Vec<(HostProfile, PolicyDefect)> {
        HostProfile::all()
            .flat_map(|profile| {
                audit(&self.lookup(&HostStatus::Known(profile)))
                    .into_iter()
                    .map(move |defect| (profile, defect))
            })
            .collect()
    }

    /// Renders one line per host status with its code and hex vectors.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<32} {:>6} {:>26} {:>26} {:>26}",
            "HOST STATUS", "CODE", "WARN", "FAIL", "IGNORE"
        );
        for profile in HostProfile::all() {
            let levels = self.lookup(&HostStatus::Known(profile));
            let _ = writeln!(
                out,
                "{:<32} {:>6} {:>26} {:>26} {:>26}",
                profile.label(),
                profile.code(),
                levels.warn.to_string(),
                levels.fail.to_string(),
                levels.ignore.to_string(),
            );
        }
        out
    }
}

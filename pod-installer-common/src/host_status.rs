// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The discrete operational state of the machine being validated.
//!
//! A host status combines three axes: the deployment [`Blend`], the
//! [`Role`] this machine plays in the pod, and the lifecycle [`Stage`]. Each
//! axis has a fixed numeric code and the codes are additive, which gives the
//! integer reported to consumers of the output blob.

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Deployment flavour of the pod.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Blend {
    Cop,
    Region,
    CopRegion,
    Pat,
}

impl Blend {
    pub const ALL: [Blend; 4] =
        [Blend::Cop, Blend::Region, Blend::CopRegion, Blend::Pat];

    pub const fn code(self) -> u32 {
        match self {
            Blend::Cop => 2,
            Blend::Region => 4,
            Blend::CopRegion => 6,
            Blend::Pat => 7,
        }
    }

    pub fn from_code(code: i64) -> Option<Blend> {
        Self::ALL.into_iter().find(|b| i64::from(b.code()) == code)
    }

    /// Whether this blend carries the region capability, which brings the
    /// private and inter networks with it.
    pub const fn has_region_flavor(self) -> bool {
        self.code() & Blend::Region.code() != 0
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Blend::Cop => "cop",
            Blend::Region => "region",
            Blend::CopRegion => "copregion",
            Blend::Pat => "pat",
        }
    }
}

impl fmt::Display for Blend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which named node of the pod this machine is.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The primary PodNet node.
    PodnetA,
    /// The secondary PodNet node.
    PodnetB,
    /// The auxiliary appliance.
    ApplianceA,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::PodnetA, Role::PodnetB, Role::ApplianceA];

    pub const fn code(self) -> u32 {
        match self {
            Role::PodnetA => 4096,
            Role::PodnetB => 8192,
            Role::ApplianceA => 32768,
        }
    }

    /// The hostname a machine playing this role is given.
    pub const fn hostname(self) -> &'static str {
        match self {
            Role::PodnetA => "podnet-a",
            Role::PodnetB => "podnet-b",
            Role::ApplianceA => "appliance-a",
        }
    }

    pub fn from_hostname(hostname: &str) -> Option<Role> {
        let hostname = hostname.trim();
        Self::ALL.into_iter().find(|r| r.hostname() == hostname)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::PodnetA => "podnet_a",
            Role::PodnetB => "podnet_b",
            Role::ApplianceA => "appliance_a",
        }
    }

    /// Lifecycle stages this role may legally be in.
    pub fn stages(self) -> &'static [Stage] {
        match self {
            Role::PodnetA => &[Stage::Validate, Stage::Install, Stage::Reinstall],
            Role::PodnetB | Role::ApplianceA => {
                &[Stage::Validate, Stage::Install]
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Installation media is absent; the node is only checked.
    Validate,
    /// First-time installation from media.
    Install,
    /// Installation of the primary node after the secondary already exists.
    Reinstall,
}

impl Stage {
    pub const fn code(self) -> u32 {
        match self {
            Stage::Validate => 64,
            Stage::Install => 128,
            Stage::Reinstall => 256,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Install => "install",
            Stage::Reinstall => "reinstall",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A legal (blend, role, stage) combination.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct HostProfile {
    blend: Blend,
    role: Role,
    stage: Stage,
}

impl HostProfile {
    /// Returns `None` if `role` may not be in `stage`.
    pub fn new(blend: Blend, role: Role, stage: Stage) -> Option<HostProfile> {
        role.stages().contains(&stage).then_some(HostProfile {
            blend,
            role,
            stage,
        })
    }

    /// Every legal profile, ordered by blend, then role, then stage.
    pub fn all() -> impl Iterator<Item = HostProfile> {
        Blend::ALL.into_iter().flat_map(|blend| {
            Role::ALL.into_iter().flat_map(move |role| {
                role.stages()
                    .iter()
                    .map(move |&stage| HostProfile { blend, role, stage })
            })
        })
    }

    pub fn blend(&self) -> Blend {
        self.blend
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn code(&self) -> u32 {
        self.blend.code() + self.stage.code() + self.role.code()
    }

    pub fn label(&self) -> String {
        format!("{}_{}_{}", self.blend, self.stage, self.role)
    }
}

impl fmt::Display for HostProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.blend, self.stage, self.role)
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("{0} is not a known host status code")]
pub struct UnknownHostStatusCode(pub u32);

/// The resolved state of this machine, or [`HostStatus::Unknown`] if the
/// inputs did not identify one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum HostStatus {
    Unknown,
    Known(HostProfile),
}

impl HostStatus {
    pub const UNKNOWN_CODE: u32 = 0;
    pub const UNKNOWN_LABEL: &'static str = "Unknown";

    pub fn code(&self) -> u32 {
        match self {
            HostStatus::Unknown => Self::UNKNOWN_CODE,
            HostStatus::Known(profile) => profile.code(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            HostStatus::Unknown => Self::UNKNOWN_LABEL.to_string(),
            HostStatus::Known(profile) => profile.label(),
        }
    }

    pub fn profile(&self) -> Option<&HostProfile> {
        match self {
            HostStatus::Unknown => None,
            HostStatus::Known(profile) => Some(profile),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, HostStatus::Unknown)
    }

    pub fn from_code(code: u32) -> Result<HostStatus, UnknownHostStatusCode> {
        if code == Self::UNKNOWN_CODE {
            return Ok(HostStatus::Unknown);
        }
        HostProfile::all()
            .find(|p| p.code() == code)
            .map(HostStatus::Known)
            .ok_or(UnknownHostStatusCode(code))
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostStatus::Unknown => f.write_str(Self::UNKNOWN_LABEL),
            HostStatus::Known(profile) => profile.fmt(f),
        }
    }
}

impl From<HostStatus> for u32 {
    fn from(status: HostStatus) -> u32 {
        status.code()
    }
}

impl TryFrom<u32> for HostStatus {
    type Error = UnknownHostStatusCode;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        HostStatus::from_code(code)
    }
}

impl JsonSchema for HostStatus {
    fn schema_name() -> String {
        "HostStatus".to_string()
    }

    fn json_schema(
        gen: &mut schemars::gen::SchemaGenerator,
    ) -> schemars::schema::Schema {
        <u32 as JsonSchema>::json_schema(gen)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_legal_profiles() {
        let all: Vec<_> = HostProfile::all().collect();
        assert_eq!(all.len(), 28);

        let codes: BTreeSet<_> = all.iter().map(|p| p.code()).collect();
        assert_eq!(codes.len(), 28, "host status codes must be distinct");
        assert!(!codes.contains(&HostStatus::UNKNOWN_CODE));

        assert!(
            HostProfile::new(Blend::Cop, Role::PodnetB, Stage::Reinstall)
                .is_none()
        );
        assert!(
            HostProfile::new(Blend::Pat, Role::ApplianceA, Stage::Reinstall)
                .is_none()
        );
    }

    #[test]
    fn test_codes_and_labels() {
        let profile =
            HostProfile::new(Blend::Cop, Role::PodnetA, Stage::Validate)
                .unwrap();
        assert_eq!(profile.code(), 4162);
        assert_eq!(profile.label(), "cop_validate_podnet_a");

        let profile = HostProfile::new(
            Blend::CopRegion,
            Role::ApplianceA,
            Stage::Install,
        )
        .unwrap();
        assert_eq!(profile.code(), 6 + 128 + 32768);
        assert_eq!(profile.label(), "copregion_install_appliance_a");

        assert_eq!(HostStatus::Unknown.code(), 0);
        assert_eq!(HostStatus::Unknown.label(), "Unknown");
    }

    #[test]
    fn test_from_code() {
        for profile in HostProfile::all() {
            assert_eq!(
                HostStatus::from_code(profile.code()),
                Ok(HostStatus::Known(profile))
            );
        }
        assert_eq!(HostStatus::from_code(0), Ok(HostStatus::Unknown));
        assert_eq!(HostStatus::from_code(4163), Err(UnknownHostStatusCode(4163)));
    }

    #[test]
    fn test_region_flavor() {
        assert!(!Blend::Cop.has_region_flavor());
        assert!(Blend::Region.has_region_flavor());
        assert!(Blend::CopRegion.has_region_flavor());
        assert!(Blend::Pat.has_region_flavor());
    }

    #[test]
    fn test_role_from_hostname() {
        assert_eq!(Role::from_hostname("podnet-a\n"), Some(Role::PodnetA));
        assert_eq!(Role::from_hostname("appliance-a"), Some(Role::ApplianceA));
        assert_eq!(Role::from_hostname("mystery-node"), None);
        assert_eq!(Role::from_hostname("podnet_a"), None);
    }

    #[test]
    fn test_serialize_as_code() {
        let status = HostStatus::Known(
            HostProfile::new(Blend::Region, Role::PodnetB, Stage::Install)
                .unwrap(),
        );
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "8324");
        assert_eq!(serde_json::from_str::<HostStatus>(&json).unwrap(), status);
        assert!(serde_json::from_str::<HostStatus>("5").is_err());
    }
}

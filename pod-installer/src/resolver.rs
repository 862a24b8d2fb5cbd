// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host status resolution.

use crate::policy::PolicyTable;
use pod_installer_common::host_status::{Blend, HostProfile, Role, Stage};
use pod_installer_common::snapshot::Snapshots;
use pod_installer_common::HostStatus;
use serde_json::Value;

/// The four signals a host status is resolved from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolverInputs {
    /// Blend declared in the instantiated metadata; `None` if absent or not
    /// a recognised blend.
    pub blend: Option<Blend>,
    /// Role derived from the hostname; `None` if not a recognised name.
    pub role: Option<Role>,
    /// Whether the installation media could be mounted.
    pub media_present: bool,
    /// Whether the media declares the secondary node enabled.
    pub secondary_enabled: bool,
}

impl ResolverInputs {
    pub fn from_snapshots(snapshots: &Snapshots) -> Self {
        let blend = snapshots
            .metadata
            .config
            .blend
            .valid()
            .copied()
            .and_then(Blend::from_code);
        let role = Role::from_hostname(&snapshots.infra.hostname);
        let media_present = snapshots.cidata.available;
        // A missing key means `false`. Any value other than a literal `false`,
        // `null` included, enables the secondary node.
        let secondary_enabled = media_present
            && !matches!(
                snapshots.cidata.config.get("podnet_b_enabled"),
                None | Some(Value::Bool(false))
            );
        Self { blend, role, media_present, secondary_enabled }
    }
}

/// Maps the inputs to a host status.
///
/// An unrecognised blend or role, or a combination the policy table has no
/// entry for, resolves to [`HostStatus::Unknown`].
pub fn resolve(inputs: &ResolverInputs, policy: &PolicyTable) -> HostStatus {
    let (Some(blend), Some(role)) = (inputs.blend, inputs.role) else {
        return HostStatus::Unknown;
    };
    let stage = match (role, inputs.media_present, inputs.secondary_enabled) {
        (_, false, _) => Stage::Validate,
        (Role::PodnetA, true, false) => Stage::Install,
        (Role::PodnetA, true, true) => Stage::Reinstall,
        (Role::PodnetB | Role::ApplianceA, true, _) => Stage::Install,
    };
    match HostProfile::new(blend, role, stage) {
        Some(profile) if policy.contains(&profile) => {
            HostStatus::Known(profile)
        }
        _ => HostStatus::Unknown,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::checks::CHECK_COUNT;
    use serde_json::json;

    fn table() -> PolicyTable {
        PolicyTable::standard(CHECK_COUNT).unwrap()
    }

    fn inputs(
        blend: Option<Blend>,
        role: Option<Role>,
        media_present: bool,
        secondary_enabled: bool,
    ) -> ResolverInputs {
        ResolverInputs { blend, role, media_present, secondary_enabled }
    }

    fn label(inputs: ResolverInputs) -> String {
        resolve(&inputs, &table()).label()
    }

    #[test]
    fn test_decision_tree() {
        let cop = Some(Blend::Cop);
        let a = Some(Role::PodnetA);
        let b = Some(Role::PodnetB);
        let appliance = Some(Role::ApplianceA);

        assert_eq!(label(inputs(cop, a, false, false)), "cop_validate_podnet_a");
        // Without media the secondary flag is irrelevant.
        assert_eq!(label(inputs(cop, a, false, true)), "cop_validate_podnet_a");
        assert_eq!(label(inputs(cop, a, true, false)), "cop_install_podnet_a");
        assert_eq!(label(inputs(cop, a, true, true)), "cop_reinstall_podnet_a");
        assert_eq!(label(inputs(cop, b, true, true)), "cop_install_podnet_b");
        assert_eq!(label(inputs(cop, b, false, false)), "cop_validate_podnet_b");
        assert_eq!(
            label(inputs(Some(Blend::Pat), appliance, true, true)),
            "pat_install_appliance_a"
        );
        assert_eq!(label(inputs(None, a, true, false)), "Unknown");
        assert_eq!(label(inputs(cop, None, true, false)), "Unknown");
    }

    #[test]
    fn test_every_profile_is_reachable() {
        let table = table();
        for profile in HostProfile::all() {
            let (media_present, secondary_enabled) = match profile.stage() {
                Stage::Validate => (false, false),
                Stage::Install => (true, false),
                Stage::Reinstall => (true, true),
            };
            let inputs = inputs(
                Some(profile.blend()),
                Some(profile.role()),
                media_present,
                secondary_enabled,
            );
            assert_eq!(resolve(&inputs, &table), HostStatus::Known(profile));
        }
    }

    #[test]
    fn test_inputs_from_snapshots() {
        let mut snapshots = Snapshots::default();
        snapshots.infra.hostname = "podnet-a\n".to_string();
        snapshots.metadata.config =
            serde_json::from_value(json!({"blend": 6})).unwrap();
        let inputs = ResolverInputs::from_snapshots(&snapshots);
        assert_eq!(inputs.blend, Some(Blend::CopRegion));
        assert_eq!(inputs.role, Some(Role::PodnetA));
        assert!(!inputs.media_present);
        assert!(!inputs.secondary_enabled);

        snapshots.cidata.available = true;
        snapshots.cidata.config =
            serde_json::from_value(json!({"podnet_b_enabled": false}))
                .unwrap();
        assert!(!ResolverInputs::from_snapshots(&snapshots).secondary_enabled);

        snapshots.cidata.config =
            serde_json::from_value(json!({"podnet_b_enabled": true})).unwrap();
        let inputs = ResolverInputs::from_snapshots(&snapshots);
        assert!(inputs.secondary_enabled);
        assert_eq!(label(inputs), "copregion_reinstall_podnet_a");

        snapshots.metadata.config =
            serde_json::from_value(json!({"blend": "cop"})).unwrap();
        assert_eq!(ResolverInputs::from_snapshots(&snapshots).blend, None);
    }

    #[test]
    fn test_numeric_string_blend_is_unknown() {
        let mut snapshots = Snapshots::default();
        snapshots.infra.hostname = "podnet-a".to_string();
        snapshots.metadata.config =
            serde_json::from_value(json!({"blend": "2"})).unwrap();
        let inputs = ResolverInputs::from_snapshots(&snapshots);
        assert_eq!(inputs.blend, None);
        assert_eq!(resolve(&inputs, &table()), HostStatus::Unknown);
    }

    #[test]
    fn test_secondary_flag_on_media() {
        let mut snapshots = Snapshots::default();
        snapshots.infra.hostname = "podnet-a".to_string();
        snapshots.metadata.config =
            serde_json::from_value(json!({"blend": 2})).unwrap();
        snapshots.cidata.available = true;

        let stage = |media: Value, snapshots: &mut Snapshots| {
            snapshots.cidata.config = serde_json::from_value(media).unwrap();
            label(ResolverInputs::from_snapshots(snapshots))
        };
        assert_eq!(stage(json!({}), &mut snapshots), "cop_install_podnet_a");
        assert_eq!(
            stage(json!({"podnet_b_enabled": false}), &mut snapshots),
            "cop_install_podnet_a"
        );
        assert_eq!(
            stage(json!({"podnet_b_enabled": null}), &mut snapshots),
            "cop_reinstall_podnet_a"
        );
        assert_eq!(
            stage(json!({"podnet_b_enabled": "no"}), &mut snapshots),
            "cop_reinstall_podnet_a"
        );
    }
}

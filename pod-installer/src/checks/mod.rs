// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The standard pod validation checks.
//!
//! Ids are grouped into blocks: hardware (0-4), network interfaces (5-19),
//! the instantiated `config.json` (20-46), the instantiated `.env` (47-82)
//! and reachability (83-89).

use crate::config::Thresholds;
use crate::registry::{CheckDefinition, CheckRegistry, RegistryError};
use pod_installer_common::host_status::Blend;
use pod_installer_common::snapshot::Snapshots;

mod env;
mod hardware;
mod interfaces;
mod pod_config;
mod reachability;

/// Number of checks in the standard registry.
pub const CHECK_COUNT: u32 = 90;

/// Builds the standard registry.
pub fn standard(
    thresholds: &Thresholds,
) -> Result<CheckRegistry, RegistryError> {
    let mut checks: Vec<CheckDefinition> = Vec::new();
    checks.extend(hardware::checks(thresholds));
    checks.extend(interfaces::checks());
    checks.extend(pod_config::checks());
    checks.extend(env::checks());
    checks.extend(reachability::checks());
    CheckRegistry::new(checks)
}

/// The blend declared in the instantiated metadata, if it is a known one.
pub(crate) fn instantiated_blend(snapshots: &Snapshots) -> Option<Blend> {
    snapshots.metadata.config.blend.valid().copied().and_then(Blend::from_code)
}

/// Whether the instantiated blend lacks the region capability, and with it
/// the private and inter networks.
pub(crate) fn lacks_region_flavor(snapshots: &Snapshots) -> bool {
    !instantiated_blend(snapshots).is_some_and(Blend::has_region_flavor)
}

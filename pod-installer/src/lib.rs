// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validation engine for pod installation.
//!
//! A run captures the input snapshots, resolves the host status, selects
//! the policy levels for it, runs every registered check and assembles a
//! [`DataBlob`] describing the outcome. All state of a run lives in a
//! [`SessionStore`].

mod aggregate;
pub mod capture;
pub mod checks;
pub mod cmd;
pub mod config;
pub mod fakes;
pub mod log;
pub mod policy;
pub mod probe;
pub mod registry;
pub mod report;
pub mod resolver;
mod runner;
pub mod session;

pub use aggregate::assemble;
pub use config::Config;
pub use runner::CheckRunner;

use crate::config::Thresholds;
use crate::policy::{PolicyError, PolicyTable};
use crate::probe::HostProbe;
use crate::registry::{CheckRegistry, RegistryError};
use crate::resolver::ResolverInputs;
use crate::session::{SessionError, SessionStore};
use pod_installer_common::snapshot::Snapshots;
use pod_installer_common::DataBlob;
use slog::{debug, info, o, Logger};

#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    #[error("invalid check registry")]
    Registry(#[from] RegistryError),

    #[error("invalid policy table")]
    Policy(#[from] PolicyError),
}

/// A check registry paired with the policy table validated against it.
#[derive(Debug)]
pub struct Validator {
    log: Logger,
    registry: CheckRegistry,
    policy: PolicyTable,
}

impl Validator {
    /// Pairs `registry` with the authored policy table, failing if the table
    /// is incomplete or inconsistent at the registry's width.
    pub fn new(
        log: &Logger,
        registry: CheckRegistry,
    ) -> Result<Validator, ValidatorError> {
        let policy = PolicyTable::standard(registry.width())?;
        Ok(Validator::with_policy(log, registry, policy))
    }

    pub fn with_policy(
        log: &Logger,
        registry: CheckRegistry,
        policy: PolicyTable,
    ) -> Validator {
        Validator {
            log: log.new(o!("component" => "Validator")),
            registry,
            policy,
        }
    }

    /// The standard checks with the given thresholds and the authored
    /// policy.
    pub fn standard(
        log: &Logger,
        thresholds: &Thresholds,
    ) -> Result<Validator, ValidatorError> {
        Validator::new(log, checks::standard(thresholds)?)
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Performs one complete run and returns its blob.
    ///
    /// The store is reset first, so nothing from an earlier run survives.
    pub fn run(
        &self,
        store: &mut dyn SessionStore,
        snapshots: Snapshots,
        probe: &dyn HostProbe,
    ) -> Result<DataBlob, SessionError> {
        let width = self.registry.width();
        store.reset(snapshots, width)?;

        let inputs = ResolverInputs::from_snapshots(store.snapshots()?);
        let status = resolver::resolve(&inputs, &self.policy);
        info!(
            self.log,
            "resolved host status";
            "status" => %status,
            "code" => status.code(),
            "inputs" => ?inputs,
        );
        store.set_host_status(status)?;

        let mut details = store.test_details()?;
        details.levels = self.policy.lookup(&status);
        debug!(
            self.log,
            "selected policy levels";
            "warn" => %details.levels.warn,
            "fail" => %details.levels.fail,
            "ignore" => %details.levels.ignore,
        );
        store.set_test_details(details)?;

        CheckRunner::new(&self.log, &self.registry).run_all(store, probe)?;
        assemble(store)
    }
}

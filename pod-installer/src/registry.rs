// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The ordered set of checks a run executes.
//!
//! A check is a predicate plus the text used to report it. Its [`TestId`]
//! is both its position in the registry and the bit it owns in every
//! bitmap, so ids must be unique and contiguous from zero.

use crate::probe::HostProbe;
use crate::probe::ProbeError;
use display_error_chain::DisplayErrorChain;
use pod_installer_common::bitmap::MAX_WIDTH;
use pod_installer_common::snapshot::Snapshots;
use pod_installer_common::TestId;
use slog::{warn, Logger};
use std::fmt;

/// What a check body can see.
pub struct CheckContext<'a> {
    pub log: &'a Logger,
    pub snapshots: &'a Snapshots,
    pub probe: &'a dyn HostProbe,
}

impl CheckContext<'_> {
    /// Unwraps a probe result, logging the error and substituting `default`
    /// if the probe failed.
    pub fn degrade<T: fmt::Debug>(
        &self,
        probe: &'static str,
        result: Result<T, ProbeError>,
        default: T,
    ) -> T {
        match result {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    self.log,
                    "probe failed, using default";
                    "probe" => probe,
                    "default" => ?default,
                    "error" => %DisplayErrorChain::new(&err),
                );
                default
            }
        }
    }
}

/// The result of evaluating a check body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub met: bool,
    pub detail: String,
}

impl Evaluation {
    pub fn new(met: bool, detail: impl Into<String>) -> Self {
        Self { met, detail: detail.into() }
    }

    pub fn met(detail: impl Into<String>) -> Self {
        Self::new(true, detail)
    }

    pub fn unmet(detail: impl Into<String>) -> Self {
        Self::new(false, detail)
    }
}

/// How a check run was reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
    /// Failed, but the active policy neither warns nor fails on it.
    Unclassified,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "Pass",
            Verdict::Warn => "Warn",
            Verdict::Fail => "Fail",
            Verdict::Unclassified => "Unclassified",
        }
    }
}

type Predicate = Box<dyn Fn(&CheckContext<'_>) -> Evaluation + Send + Sync>;

/// Decides from input data alone that a check does not apply.
pub type SkipRule = fn(&Snapshots) -> bool;

pub struct CheckDefinition {
    id: TestId,
    code: &'static str,
    title: String,
    predicate: Predicate,
    skip: Option<SkipRule>,
}

impl fmt::Debug for CheckDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckDefinition")
            .field("id", &self.id)
            .field("code", &self.code)
            .field("title", &self.title)
            .field("skip", &self.skip.is_some())
            .finish_non_exhaustive()
    }
}

impl CheckDefinition {
    pub fn new<F>(
        id: u16,
        code: &'static str,
        title: impl Into<String>,
        predicate: F,
    ) -> Self
    where
        F: Fn(&CheckContext<'_>) -> Evaluation + Send + Sync + 'static,
    {
        Self {
            id: TestId::new(id),
            code,
            title: title.into(),
            predicate: Box::new(predicate),
            skip: None,
        }
    }

    /// Ignores the check whenever `rule` holds for the run's snapshots.
    pub fn skip_when(mut self, rule: SkipRule) -> Self {
        self.skip = Some(rule);
        self
    }

    pub fn id(&self) -> TestId {
        self.id
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn evaluate(&self, cx: &CheckContext<'_>) -> Evaluation {
        (self.predicate)(cx)
    }

    pub fn skipped(&self, snapshots: &Snapshots) -> bool {
        self.skip.is_some_and(|rule| rule(snapshots))
    }

    pub fn message(&self, verdict: Verdict, detail: &str) -> String {
        if detail.is_empty() {
            format!("{} {} - {}", self.code, self.title, verdict.as_str())
        } else {
            format!(
                "{} {} - {} - {}",
                self.code,
                self.title,
                verdict.as_str(),
                detail
            )
        }
    }

    pub fn ignore_message(&self) -> String {
        format!("{} {} - Ignore", self.code, self.title)
    }

    pub fn unresolved_message(&self) -> String {
        self.message(Verdict::Fail, "host status unresolved")
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry has no checks")]
    Empty,

    #[error("registry has {count} checks, at most {MAX_WIDTH} are supported")]
    TooMany { count: usize },

    #[error("test id {0} is registered more than once")]
    Duplicate(TestId),

    #[error("test id {found} registered at position {expected}")]
    NotContiguous { expected: usize, found: TestId },
}

#[derive(Debug)]
pub struct CheckRegistry {
    checks: Vec<CheckDefinition>,
}

impl CheckRegistry {
    /// Requires the checks to be listed in id order, starting at zero.
    pub fn new(
        checks: Vec<CheckDefinition>,
    ) -> Result<CheckRegistry, RegistryError> {
        if checks.is_empty() {
            return Err(RegistryError::Empty);
        }
        if checks.len() > MAX_WIDTH as usize {
            return Err(RegistryError::TooMany { count: checks.len() });
        }
        for (position, check) in checks.iter().enumerate() {
            if check.id.index() == position {
                continue;
            }
            if checks[..position].iter().any(|c| c.id == check.id) {
                return Err(RegistryError::Duplicate(check.id));
            }
            return Err(RegistryError::NotContiguous {
                expected: position,
                found: check.id,
            });
        }
        Ok(CheckRegistry { checks })
    }

    /// Bit width of every bitmap used with this registry.
    pub fn width(&self) -> u32 {
        self.checks.len() as u32
    }

    pub fn get(&self, id: TestId) -> Option<&CheckDefinition> {
        self.checks.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckDefinition> {
        self.checks.iter()
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The output of a validation run.

use crate::bitmap::TestBitmap;
use crate::bitmap::TestId;
use crate::host_status::HostStatus;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// Everything a presenter needs to decide whether provisioning may proceed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataBlob {
    pub host_status: HostStatus,
    pub host_status_label: String,
    pub pass_bitmap: TestBitmap,
    pub warn_bitmap: TestBitmap,
    pub fail_bitmap: TestBitmap,
    /// One verdict per check, indexed by [`TestId`].
    pub results: Vec<String>,
}

/// Outcome counts of a run.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub struct Summary {
    pub verified: u32,
    pub failed: u32,
    pub warnings: u32,
    /// Checks in none of the pass, warn or fail classes.
    pub ignored: u32,
    pub total: u32,
}

impl DataBlob {
    /// Provisioning may only proceed if nothing failed.
    pub fn may_proceed(&self) -> bool {
        self.fail_bitmap.is_empty()
    }

    fn messages(&self, map: &TestBitmap) -> Vec<&str> {
        map.iter()
            .filter_map(|id: TestId| self.results.get(id.index()))
            .map(String::as_str)
            .collect()
    }

    /// Verdicts of the failed checks, in id order.
    pub fn failures(&self) -> Vec<&str> {
        self.messages(&self.fail_bitmap)
    }

    /// Verdicts of the checks that raised a warning, in id order.
    pub fn warnings(&self) -> Vec<&str> {
        self.messages(&self.warn_bitmap)
    }

    pub fn summary(&self) -> Summary {
        let verified = self.pass_bitmap.count_ones();
        let failed = self.fail_bitmap.count_ones();
        let warnings = self.warn_bitmap.count_ones();
        let total = self.pass_bitmap.width();
        Summary {
            verified,
            failed,
            warnings,
            ignored: total.saturating_sub(verified + failed + warnings),
            total,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn blob(pass: u128, warn: u128, fail: u128) -> DataBlob {
        let width = 4;
        DataBlob {
            host_status: HostStatus::Unknown,
            host_status_label: HostStatus::Unknown.label(),
            pass_bitmap: TestBitmap::from_bits(width, pass).unwrap(),
            warn_bitmap: TestBitmap::from_bits(width, warn).unwrap(),
            fail_bitmap: TestBitmap::from_bits(width, fail).unwrap(),
            results: vec![
                "a - Pass".to_string(),
                "b - Warn".to_string(),
                "c - Fail".to_string(),
                "d - Ignore".to_string(),
            ],
        }
    }

    #[test]
    fn test_summary_and_failures() {
        let blob = blob(0b0001, 0b0010, 0b0100);
        assert!(!blob.may_proceed());
        assert_eq!(blob.failures(), vec!["c - Fail"]);
        assert_eq!(blob.warnings(), vec!["b - Warn"]);
        assert_eq!(
            blob.summary(),
            Summary {
                verified: 1,
                failed: 1,
                warnings: 1,
                ignored: 1,
                total: 4
            }
        );

        let blob = self::blob(0b0011, 0, 0);
        assert!(blob.may_proceed());
        assert!(blob.failures().is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(blob(1, 0, 0)).unwrap();
        let mut keys: Vec<_> =
            value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "failBitmap",
                "hostStatus",
                "hostStatusLabel",
                "passBitmap",
                "results",
                "warnBitmap"
            ]
        );
        assert_eq!(value["hostStatus"], 0);
    }
}

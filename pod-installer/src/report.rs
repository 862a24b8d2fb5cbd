// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plain-text rendering of a [`DataBlob`].

use pod_installer_common::DataBlob;
use std::fmt::Write;

pub fn render(blob: &DataBlob) -> String {
    let mut out = String::new();
    let label = &blob.host_status_label;
    let summary = blob.summary();

    let _ = writeln!(
        out,
        "Host status: {label} ({})",
        blob.host_status.code()
    );
    let _ = writeln!(
        out,
        "Verified: {}, Warnings: {}, Failed: {}, Ignored: {}, Total: {}",
        summary.verified,
        summary.warnings,
        summary.failed,
        summary.ignored,
        summary.total,
    );

    if blob.host_status.is_unknown() {
        let _ = writeln!(out, "Could not determine host status to run tests");
        return out;
    }

    if blob.may_proceed() {
        let _ =
            writeln!(out, "All good, no tests have failed for {label}");
    } else {
        let _ = writeln!(
            out,
            "{}/{} Tests Failed for {label}",
            summary.failed, summary.total
        );
        for message in blob.failures() {
            let _ = writeln!(out, "  {message}");
        }
    }

    let warnings = blob.warnings();
    if !warnings.is_empty() {
        let _ = writeln!(out, "Warnings:");
        for message in warnings {
            let _ = writeln!(out, "  {message}");
        }
    }
    out
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builds the data blob from a finished session.

use crate::session::{SessionError, SessionStore};
use pod_installer_common::DataBlob;

/// Reads the session and returns the blob a presenter consumes.
///
/// This is read-only; calling it twice on the same session yields the same
/// blob.
pub fn assemble(store: &dyn SessionStore) -> Result<DataBlob, SessionError> {
    let host_status = store.host_status()?;
    let details = store.test_details()?;
    Ok(DataBlob {
        host_status,
        host_status_label: host_status.label(),
        pass_bitmap: details.outcomes.pass,
        warn_bitmap: details.outcomes.warn,
        fail_bitmap: details.outcomes.fail,
        results: details.results,
    })
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Types shared between the pod installer validation engine and the
//! programs that present its results.

pub mod bitmap;
pub mod blob;
pub mod host_status;
pub mod snapshot;

pub use bitmap::TestBitmap;
pub use bitmap::TestId;
pub use blob::DataBlob;
pub use blob::Summary;
pub use host_status::HostStatus;

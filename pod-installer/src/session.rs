// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-run session state.
//!
//! A session holds the captured input snapshots, the resolved host status,
//! the policy levels selected for it, the running outcome bitmaps and the
//! result vector. There is exactly one session, identified by
//! [`SESSION_ID`], and [`SessionStore::reset`] overwrites it completely.

use crate::policy::PolicyLevels;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use pod_installer_common::snapshot::Snapshots;
use pod_installer_common::HostStatus;
use pod_installer_common::TestBitmap;
use serde::Deserialize;
use serde::Serialize;
use slog::{debug, error, o, Logger};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;

/// The only session identity a store ever holds.
pub const SESSION_ID: u32 = 1;

/// Permissions of the ledger file, which holds the captured `.env`.
const LEDGER_MODE: u32 = 0o600;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session has not been reset")]
    NotInitialized,

    #[error("bitmap width {found} does not match session width {expected}")]
    WidthMismatch { expected: u32, found: u32 },

    #[error("result vector has {found} slots, expected {expected}")]
    ResultsLength { expected: usize, found: usize },

    #[error("ledger {path} belongs to session {found}, expected {SESSION_ID}")]
    ForeignSession { path: Utf8PathBuf, found: u32 },

    #[error("failed to access session ledger {path}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("failed to parse session ledger {path}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        err: serde_json::Error,
    },

    #[error("failed to serialize session ledger")]
    Serialize(#[source] serde_json::Error),
}

/// The outcome of every check that has run so far.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcomes {
    pub pass: TestBitmap,
    pub warn: TestBitmap,
    pub fail: TestBitmap,
    pub ignore: TestBitmap,
}

impl Outcomes {
    pub fn empty(width: u32) -> Self {
        Self {
            pass: TestBitmap::empty(width),
            warn: TestBitmap::empty(width),
            fail: TestBitmap::empty(width),
            ignore: TestBitmap::empty(width),
        }
    }

    fn widths(&self) -> [u32; 4] {
        [
            self.pass.width(),
            self.warn.width(),
            self.fail.width(),
            self.ignore.width(),
        ]
    }
}

/// Policy levels, outcomes and per-check verdicts of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDetails {
    pub levels: PolicyLevels,
    pub outcomes: Outcomes,
    pub results: Vec<String>,
}

impl TestDetails {
    pub fn empty(width: u32) -> Self {
        Self {
            levels: PolicyLevels::empty(width),
            outcomes: Outcomes::empty(width),
            results: vec![String::new(); width as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.outcomes.pass.width()
    }

    fn check_shape(&self, width: u32) -> Result<(), SessionError> {
        let widths = self.outcomes.widths().into_iter().chain([
            self.levels.warn.width(),
            self.levels.fail.width(),
            self.levels.ignore.width(),
        ]);
        for found in widths {
            if found != width {
                return Err(SessionError::WidthMismatch {
                    expected: width,
                    found,
                });
            }
        }
        if self.results.len() != width as usize {
            return Err(SessionError::ResultsLength {
                expected: width as usize,
                found: self.results.len(),
            });
        }
        Ok(())
    }
}

/// Everything stored for the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: u32,
    pub snapshots: Snapshots,
    pub host_status: HostStatus,
    pub tests: TestDetails,
}

impl SessionState {
    fn new(snapshots: Snapshots, width: u32) -> Self {
        Self {
            session_id: SESSION_ID,
            snapshots,
            host_status: HostStatus::Unknown,
            tests: TestDetails::empty(width),
        }
    }
}

/// Get/set access to the state of the single validation session.
pub trait SessionStore {
    /// Discards any previous session and starts a new one holding
    /// `snapshots`, with all bitmaps zeroed and `width` blank results.
    fn reset(
        &mut self,
        snapshots: Snapshots,
        width: u32,
    ) -> Result<(), SessionError>;

    fn snapshots(&self) -> Result<&Snapshots, SessionError>;

    fn host_status(&self) -> Result<HostStatus, SessionError>;

    fn set_host_status(
        &mut self,
        status: HostStatus,
    ) -> Result<(), SessionError>;

    fn test_details(&self) -> Result<TestDetails, SessionError>;

    fn set_test_details(
        &mut self,
        details: TestDetails,
    ) -> Result<(), SessionError>;
}

/// A [`SessionStore`] that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    state: Option<SessionState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    fn state_mut(&mut self) -> Result<&mut SessionState, SessionError> {
        self.state.as_mut().ok_or(SessionError::NotInitialized)
    }
}

impl SessionStore for MemorySessionStore {
    fn reset(
        &mut self,
        snapshots: Snapshots,
        width: u32,
    ) -> Result<(), SessionError> {
        self.state = Some(SessionState::new(snapshots, width));
        Ok(())
    }

    fn snapshots(&self) -> Result<&Snapshots, SessionError> {
        self.state
            .as_ref()
            .map(|s| &s.snapshots)
            .ok_or(SessionError::NotInitialized)
    }

    fn host_status(&self) -> Result<HostStatus, SessionError> {
        self.state
            .as_ref()
            .map(|s| s.host_status)
            .ok_or(SessionError::NotInitialized)
    }

    fn set_host_status(
        &mut self,
        status: HostStatus,
    ) -> Result<(), SessionError> {
        self.state_mut()?.host_status = status;
        Ok(())
    }

    fn test_details(&self) -> Result<TestDetails, SessionError> {
        self.state
            .as_ref()
            .map(|s| s.tests.clone())
            .ok_or(SessionError::NotInitialized)
    }

    fn set_test_details(
        &mut self,
        details: TestDetails,
    ) -> Result<(), SessionError> {
        let state = self.state_mut()?;
        details.check_shape(state.tests.width())?;
        state.tests = details;
        Ok(())
    }
}

/// A [`SessionStore`] persisted as a JSON ledger on disk, so that a later
/// invocation can report on the last run.
///
/// The ledger is rewritten on every update: written to a temporary file
/// next to it and renamed into place.
#[derive(Debug)]
pub struct LedgerSessionStore {
    log: Logger,
    path: Utf8PathBuf,
    inner: MemorySessionStore,
}

impl LedgerSessionStore {
    /// Opens the ledger at `path`, loading the last session if one exists.
    pub fn open(log: &Logger, path: &Utf8Path) -> Result<Self, SessionError> {
        let log = log.new(o!(
            "component" => "LedgerSessionStore",
            "path" => path.to_string(),
        ));
        let state = match std::fs::read_to_string(path) {
            Ok(contents) => {
                let state: SessionState = serde_json::from_str(&contents)
                    .map_err(|err| SessionError::Parse {
                        path: path.to_owned(),
                        err,
                    })?;
                if state.session_id != SESSION_ID {
                    return Err(SessionError::ForeignSession {
                        path: path.to_owned(),
                        found: state.session_id,
                    });
                }
                debug!(log, "loaded session ledger");
                Some(state)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(log, "no session ledger yet");
                None
            }
            Err(err) => {
                return Err(SessionError::Io { path: path.to_owned(), err });
            }
        };
        Ok(Self {
            log,
            path: path.to_owned(),
            inner: MemorySessionStore { state },
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.inner.state()
    }

    fn persist(&self) -> Result<(), SessionError> {
        let Some(state) = self.inner.state() else {
            return Err(SessionError::NotInitialized);
        };
        let contents = serde_json::to_vec_pretty(state)
            .map_err(SessionError::Serialize)?;
        write_atomic(&self.path, &contents).map_err(|err| {
            error!(
                self.log,
                "failed to write session ledger";
                "error" => %err,
            );
            SessionError::Io { path: self.path.clone(), err }
        })
    }
}

fn write_atomic(path: &Utf8Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    match std::fs::remove_file(&tmp) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(LEDGER_MODE)
        .open(&tmp)?;
    file.write_all(contents)?;
    file.sync_all()?;
    std::fs::rename(&tmp, path)
}

impl SessionStore for LedgerSessionStore {
    fn reset(
        &mut self,
        snapshots: Snapshots,
        width: u32,
    ) -> Result<(), SessionError> {
        self.inner.reset(snapshots, width)?;
        debug!(self.log, "session reset"; "width" => width);
        self.persist()
    }

    fn snapshots(&self) -> Result<&Snapshots, SessionError> {
        self.inner.snapshots()
    }

    fn host_status(&self) -> Result<HostStatus, SessionError> {
        self.inner.host_status()
    }

    fn set_host_status(
        &mut self,
        status: HostStatus,
    ) -> Result<(), SessionError> {
        self.inner.set_host_status(status)?;
        self.persist()
    }

    fn test_details(&self) -> Result<TestDetails, SessionError> {
        self.inner.test_details()
    }

    fn set_test_details(
        &mut self,
        details: TestDetails,
    ) -> Result<(), SessionError> {
        self.inner.set_test_details(details)?;
        self.persist()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use camino_tempfile::Utf8TempDir;
    use pod_installer_common::TestId;
    use std::os::unix::fs::PermissionsExt;

    fn test_log() -> Logger {
        Logger::root(slog::Discard, o!())
    }

    #[test]
    fn test_memory_store_requires_reset() {
        let mut store = MemorySessionStore::new();
        assert_matches!(store.test_details(), Err(SessionError::NotInitialized));
        assert_matches!(
            store.set_host_status(HostStatus::Unknown),
            Err(SessionError::NotInitialized)
        );
    }

    #[test]
    fn test_reset_starts_clean() {
        let mut store = MemorySessionStore::new();
        store.reset(Snapshots::default(), 4).unwrap();

        let mut details = store.test_details().unwrap();
        details.outcomes.fail.set(TestId::new(2));
        details.results[2] = "x - Fail - y".to_string();
        store.set_test_details(details).unwrap();
        assert!(!store.test_details().unwrap().outcomes.fail.is_empty());

        store.reset(Snapshots::default(), 4).unwrap();
        let details = store.test_details().unwrap();
        assert_eq!(details, TestDetails::empty(4));
        assert!(details.results.iter().all(String::is_empty));
        assert_eq!(store.host_status().unwrap(), HostStatus::Unknown);
    }

    #[test]
    fn test_rejects_mismatched_width() {
        let mut store = MemorySessionStore::new();
        store.reset(Snapshots::default(), 4).unwrap();
        assert_matches!(
            store.set_test_details(TestDetails::empty(5)),
            Err(SessionError::WidthMismatch { expected: 4, found: 5 })
        );

        let mut details = TestDetails::empty(4);
        details.results.pop();
        assert_matches!(
            store.set_test_details(details),
            Err(SessionError::ResultsLength { expected: 4, found: 3 })
        );
    }

    #[test]
    fn test_ledger_round_trip() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("ledger").join("session.json");
        let log = test_log();

        let mut store = LedgerSessionStore::open(&log, &path).unwrap();
        assert!(store.state().is_none());
        store.reset(Snapshots::default(), 3).unwrap();
        let mut details = store.test_details().unwrap();
        details.outcomes.pass.set(TestId::new(0));
        details.results[0] = "a - Pass - ok".to_string();
        store.set_test_details(details.clone()).unwrap();

        let reopened = LedgerSessionStore::open(&log, &path).unwrap();
        assert_eq!(reopened.state(), store.state());
        assert_eq!(reopened.test_details().unwrap(), details);
        assert!(!path.with_extension("json.tmp").exists());
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, LEDGER_MODE);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap())
                .unwrap();
        assert_eq!(raw["session_id"], 1);
        assert_eq!(raw["tests"]["outcomes"]["pass"]["bits"], "1");
    }

    #[test]
    fn test_ledger_rejects_garbage() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_matches!(
            LedgerSessionStore::open(&test_log(), &path),
            Err(SessionError::Parse { .. })
        );
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Facilities for the pod installer command-line entry point.

use display_error_chain::DisplayErrorChain;

/// Exit status for failures other than bad usage.
pub const EXIT_FAILURE: i32 = 1;
/// Exit status for bad command-line usage.
pub const EXIT_USAGE: i32 = 2;

/// Error returned from a subcommand, classified by how the process exits.
#[derive(Debug)]
pub enum CmdError {
    /// Incorrect command-line arguments
    Usage(String),
    /// All other errors
    Failure(anyhow::Error),
}

impl CmdError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CmdError::Usage(_) => EXIT_USAGE,
            CmdError::Failure(_) => EXIT_FAILURE,
        }
    }
}

impl std::fmt::Display for CmdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CmdError::Usage(message) => write!(f, "{message}"),
            CmdError::Failure(error) => {
                let chain: &(dyn std::error::Error + 'static) =
                    error.as_ref();
                write!(f, "{}", DisplayErrorChain::new(chain))
            }
        }
    }
}

/// Prints the error to stderr and exits the process with the status
/// matching its kind.
pub fn fatal(cmd_error: CmdError) -> ! {
    let arg0_result = std::env::args().next();
    let arg0 = arg0_result.as_deref().unwrap_or("pod-installer");
    let exit_code = cmd_error.exit_code();
    eprintln!("{arg0}: {cmd_error}");
    std::process::exit(exit_code);
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_failure_prints_chain() {
        let err: Result<(), std::io::Error> =
            Err(std::io::Error::other("disk on fire"));
        let err = err.context("reading ledger").unwrap_err();
        let cmd_error = CmdError::Failure(err);
        assert_eq!(cmd_error.exit_code(), EXIT_FAILURE);
        let text = cmd_error.to_string();
        assert!(text.contains("reading ledger"), "{text}");
        assert!(text.contains("disk on fire"), "{text}");

        let usage = CmdError::Usage("bad flag".to_string());
        assert_eq!(usage.exit_code(), EXIT_USAGE);
        assert_eq!(usage.to_string(), "bad flag");
    }
}

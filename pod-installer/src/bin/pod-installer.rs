// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Executable for the pod installer validation engine

use anyhow::{anyhow, Context};
use camino::Utf8PathBuf;
use clap::Parser;
use pod_installer::capture::capture;
use pod_installer::checks::CHECK_COUNT;
use pod_installer::cmd::{fatal, CmdError};
use pod_installer::log::setup_log;
use pod_installer::policy::PolicyTable;
use pod_installer::probe::SystemProbe;
use pod_installer::session::LedgerSessionStore;
use pod_installer::{assemble, report, Config, Validator};
use pod_installer_common::DataBlob;
use slog::info;

#[derive(Debug, Parser)]
#[clap(name = "pod-installer", about = "Validates a pod node before install")]
enum Args {
    /// Capture the host's inputs, run every check and print the result.
    /// Exits non-zero if any check failed.
    Validate {
        /// Path to the TOML configuration file
        #[clap(long, env = "POD_INSTALLER_CONFIG", action)]
        config: Option<Utf8PathBuf>,

        /// Print the data blob as JSON instead of a report
        #[clap(long, action)]
        json: bool,
    },

    /// Print the result of the last run from the session ledger
    Show {
        /// Path to the TOML configuration file
        #[clap(long, env = "POD_INSTALLER_CONFIG", action)]
        config: Option<Utf8PathBuf>,

        /// Print the data blob as JSON instead of a report
        #[clap(long, action)]
        json: bool,
    },

    /// Print the policy table
    Policy {
        /// Check every row for unclassified or doubly classified checks
        /// instead. Exits non-zero on any defect.
        #[clap(long, action)]
        audit: bool,
    },
}

fn main() {
    if let Err(cmd_error) = do_run() {
        fatal(cmd_error);
    }
}

fn do_run() -> Result<(), CmdError> {
    let args = Args::parse();

    match args {
        Args::Validate { config, json } => {
            let config = load_config(config)?;
            let blob = validate(&config).map_err(CmdError::Failure)?;
            print_blob(&blob, json)?;
            if !blob.may_proceed() {
                let failed = blob.summary().failed;
                return Err(CmdError::Failure(anyhow!(
                    "{failed} checks failed for {}",
                    blob.host_status_label
                )));
            }
            Ok(())
        }
        Args::Show { config, json } => {
            let config = load_config(config)?;
            let blob = show(&config).map_err(CmdError::Failure)?;
            print_blob(&blob, json)
        }
        Args::Policy { audit } => policy(audit).map_err(CmdError::Failure),
    }
}

fn load_config(path: Option<Utf8PathBuf>) -> Result<Config, CmdError> {
    match path {
        Some(path) => Config::from_file(&path).map_err(|e| {
            CmdError::Usage(format!("failed to load config: {e:#}"))
        }),
        None => Ok(Config::default()),
    }
}

fn validate(config: &Config) -> anyhow::Result<DataBlob> {
    let log = setup_log(&config.log)?;
    let validator = Validator::standard(&log, &config.thresholds)
        .context("failed to build validator")?;
    let snapshots = capture(&log, &config.sources)
        .context("failed to capture input snapshots")?;
    let mut store =
        LedgerSessionStore::open(&log, &config.session.ledger_path)
            .context("failed to open session ledger")?;
    let probe = SystemProbe::new(&log, &config.probe);
    let blob = validator.run(&mut store, snapshots, &probe)?;
    info!(
        log,
        "validation complete";
        "host_status" => &blob.host_status_label,
        "failed" => blob.fail_bitmap.count_ones(),
        "warnings" => blob.warn_bitmap.count_ones(),
    );
    Ok(blob)
}

fn show(config: &Config) -> anyhow::Result<DataBlob> {
    let log = setup_log(&config.log)?;
    let store = LedgerSessionStore::open(&log, &config.session.ledger_path)
        .context("failed to open session ledger")?;
    let blob = assemble(&store)
        .with_context(|| format!("no session in {}", store.path()))?;
    Ok(blob)
}

fn print_blob(blob: &DataBlob, json: bool) -> Result<(), CmdError> {
    if json {
        let text = serde_json::to_string_pretty(blob)
            .context("failed to serialize data blob")
            .map_err(CmdError::Failure)?;
        println!("{text}");
    } else {
        print!("{}", report::render(blob));
    }
    Ok(())
}

fn policy(audit: bool) -> anyhow::Result<()> {
    let table = PolicyTable::standard(CHECK_COUNT)?;
    if !audit {
        print!("{}", table.render());
        return Ok(());
    }
    let defects = table.audit();
    for (profile, defect) in &defects {
        println!("{profile}: {defect}");
    }
    if defects.is_empty() {
        println!("policy table is consistent");
        Ok(())
    } else {
        Err(anyhow!("policy table has {} defects", defects.len()))
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logger construction for the pod installer binary.

use crate::config::LogConfig;
use anyhow::Context;
use slog::{o, Drain, Logger};

/// Builds the root logger.
///
/// Records are always appended to `config.path`. With `config.stderr` set
/// they are also written to stderr, filtered by `RUST_LOG` (info if unset).
pub fn setup_log(config: &LogConfig) -> anyhow::Result<Logger> {
    let path = &config.path;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("error opening log file {path}"))?;
    let file_drain =
        slog_term::FullFormat::new(slog_term::PlainDecorator::new(file))
            .build()
            .fuse();

    let drain = if config.stderr {
        let drain = slog::Duplicate::new(file_drain, stderr_drain()).fuse();
        slog_async::Async::new(drain).build().fuse()
    } else {
        slog_async::Async::new(file_drain).build().fuse()
    };
    Ok(Logger::root(drain, o!("component" => "pod-installer")))
}

fn stderr_drain() -> impl Drain<Ok = (), Err = slog::Never> {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let mut builder = slog_envlogger::LogBuilder::new(drain);
    builder = match std::env::var("RUST_LOG") {
        Ok(filter) => builder.parse(&filter),
        Err(_) => builder.filter(None, slog::FilterLevel::Info),
    };
    builder.build()
}

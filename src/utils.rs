//! Helpers shared by the node binaries.

use glob::glob;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// Defaults to the `info` level; `RUST_LOG` overrides it. Logs go to
/// stderr so stdout carries only the word counts and reports.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Expands a glob spec into the files it matches, in glob order.
///
/// Returns an error if the pattern is invalid. Unreadable entries are
/// skipped.
pub fn input_files(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    Ok(glob(pattern)?.flatten().filter(|path| path.is_file()).collect())
}

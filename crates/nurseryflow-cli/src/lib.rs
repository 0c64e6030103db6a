pub mod cli;
pub mod diagnostics;
pub mod dispatch;

use anyhow::Result;
use clap::Parser;
use nurseryflow_core::config::{load_config, resolve_config_path};

use crate::cli::Cli;
use crate::diagnostics::{DiagnosticsSession, LogSink};

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let sink = if cli.command.is_some() {
        LogSink::Stderr
    } else {
        LogSink::Silent
    };
    let diagnostics = DiagnosticsSession::initialize(cli.diagnostics, sink, &configured_level())?;
    if let Some(path) = diagnostics.path() {
        eprintln!("Diagnostics enabled: {}", path.display());
    }

    let result = dispatch::run_with_deps(cli);
    if let Err(error) = &result {
        tracing::debug!(error = %format!("{error:#}"), "command failed");
    }
    result
}

/// Log level from a readable config, `info` otherwise. Config errors surface later
/// from the command that needs the config.
fn configured_level() -> String {
    resolve_config_path()
        .ok()
        .filter(|path| path.exists())
        .and_then(|path| load_config(&path).ok())
        .map_or_else(|| "info".to_string(), |config| config.logging.level)
}

use anyhow::Result;
use colored::Colorize;
use tracing::{debug, warn};

use crate::analysis::Engine;
use crate::cli::Cli;
use crate::config::Config;
use crate::discovery;
use crate::error::EngineError;
use crate::exit::CppsieveExit;
use crate::reporting;
use crate::types::{ScanReport, Severity};

/// Resolves configuration from the file and the command line.
///
/// # Errors
/// Returns an error on invalid configuration or unknown rule/severity names.
pub fn resolve_config(cli: &Cli) -> crate::error::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    for rule in &cli.disable {
        config.disable(rule)?;
    }
    if let Some(level) = &cli.severity {
        config.min_severity =
            Severity::parse(level).ok_or_else(|| EngineError::Config(format!("unknown severity `{level}`")))?;
    }
    Ok(config)
}

/// Discovers, analyzes, and reports. Returns the scan for callers that want
/// to inspect it.
///
/// # Errors
/// Returns an error if configuration or discovery fails.
pub fn scan(cli: &Cli) -> crate::error::Result<(Config, ScanReport)> {
    let config = resolve_config(cli)?;
    let files = discovery::discover(&cli.paths)?;
    debug!(files = files.len(), "discovered sources");
    let units = discovery::load_units(&files)?;
    let mut report = Engine::from_config(&config).analyze_all(&units);
    report.retain_severity(config.min_severity);
    Ok((config, report))
}

/// Runs the command line and picks the exit code.
///
/// # Errors
/// Returns an error if the report cannot be rendered.
pub fn execute(cli: &Cli) -> Result<CppsieveExit> {
    let report = match scan(cli) {
        Ok((_, report)) => report,
        Err(e @ (EngineError::Config(_) | EngineError::Io { .. })) => {
            eprintln!("{} {e}", "Error:".red());
            return Ok(CppsieveExit::InvalidInput);
        }
        Err(e) => return Err(e.into()),
    };

    reporting::emit(&report, cli.format)?;

    if !cli.ci {
        return Ok(CppsieveExit::Success);
    }
    if report.summary.units_failed > 0 {
        warn!(failed = report.summary.units_failed, "units failed analysis");
        return Ok(CppsieveExit::Error);
    }
    if report.has_findings_at_least(Severity::Warning) {
        return Ok(CppsieveExit::Findings);
    }
    Ok(CppsieveExit::Success)
}

//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use harness_bundler::diagnostics::to_diagnostic_error;
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Bundle(e) => bundle_error_to_miette(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert a bundling error to a miette Report.
///
/// Rolldown errors carry one or more diagnostics; the first one is used as
/// the primary report.
pub fn bundle_error_to_miette(err: harness_bundler::Error) -> Report {
    match err.diagnostics().first() {
        Some(diag) => Report::new(to_diagnostic_error(diag)),
        None => miette::miette!("{}", err),
    }
}

/// Render every diagnostic of a bundling error for the operator console.
pub fn render_bundle_error(err: &harness_bundler::Error) -> String {
    let diagnostics = err.diagnostics();
    if diagnostics.is_empty() {
        return err.to_string();
    }

    diagnostics
        .iter()
        .map(|diag| format!("{:?}", Report::new(to_diagnostic_error(diag))))
        .collect::<Vec<_>>()
        .join("\n")
}

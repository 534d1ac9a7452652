//! On-demand bundling for the browser test harness.
//!
//! Every call performs a fresh Rolldown build: there is no build cache. The
//! harness server calls into this crate once per bundle request and streams
//! the produced script back to the browser.
//!
//! # Example
//!
//! ```rust,no_run
//! use harness_bundler::{BuildOptions, Bundler, RolldownBundler, inject_source_capture};
//!
//! # async fn run() -> harness_bundler::Result<()> {
//! let options = BuildOptions::new("test/index.js").sourcemap(true);
//! let code = RolldownBundler.bundle(options).await?;
//! let served = inject_source_capture(&code);
//! # let _ = served;
//! # Ok(())
//! # }
//! ```

mod build;
pub mod diagnostics;
mod entry;
mod inject;
mod options;

pub use build::{Bundler, RolldownBundler};
pub use entry::{ENTRY_MODULE_NAME, entry_module_source, write_entry_module};
pub use inject::{SOURCE_CAPTURE_GLOBAL, SOURCE_MAP_MARKER, inject_source_capture};
pub use options::BuildOptions;

use std::time::Duration;

/// Error types for harness-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rolldown reported one or more build diagnostics.
    #[error("{}", format_bundler_error(.0))]
    Bundler(Vec<diagnostics::ExtractedDiagnostic>),

    /// The build did not finish within the configured bound.
    #[error("Build timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The build produced no entry chunk.
    #[error("Build produced no output chunk for {0}")]
    EmptyOutput(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for harness-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a bundler error from a Rolldown error.
    ///
    /// Extracts structured diagnostics from Rolldown's error types.
    pub fn from_rolldown_batch(error: &dyn std::fmt::Debug) -> Self {
        Error::Bundler(diagnostics::extract_from_rolldown_error(error))
    }

    /// Diagnostics carried by this error, if it came from Rolldown.
    pub fn diagnostics(&self) -> &[diagnostics::ExtractedDiagnostic] {
        match self {
            Error::Bundler(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}

fn format_bundler_error(diagnostics: &[diagnostics::ExtractedDiagnostic]) -> String {
    match diagnostics {
        [] => "Unknown bundler error".to_string(),
        [diag] => format!("{}: {}", diag.kind, diag.message),
        many => format!(
            "{} errors: {}",
            many.len(),
            many.iter()
                .map(|d| format!("{}: {}", d.kind, d.message))
                .collect::<Vec<_>>()
                .join("; ")
        ),
    }
}

//! Error handling for the harness CLI.
//!
//! A hierarchical error type system built on `thiserror`. Each variant is
//! meant to be actionable: configuration errors carry a hint, bundling errors
//! carry the extracted Rolldown diagnostics.
//!
//! # Example
//!
//! ```rust,no_run
//! use harness_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_frame(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("Check the --frame argument")
//! }
//! ```

pub mod miette;

use std::path::PathBuf;
use thiserror::Error;

pub use self::miette::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (invalid values, missing test files, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bundling errors surfaced outside a request (requests degrade instead)
    #[error("Bundle error: {0}")]
    Bundle(#[from] harness_bundler::Error),

    /// Invalid route pattern registered with the router
    #[error("Route error: {0}")]
    Route(#[from] crate::router::RouteError),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP server errors (bind failures, serve loop errors)
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Explicit config file doesn't exist
    #[error("Config file not found: {}\n\nHint: Create a harness.config.json file or fix the --config path", .0.display())]
    NotFound(PathBuf),

    /// Config sources could not be merged or deserialized
    #[error("Invalid configuration: {0}\n\nHint: Check harness.config.json syntax and HARNESS_* environment variables")]
    Invalid(String),

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_missing_field() {
        let err = ConfigError::MissingField {
            field: "files".to_string(),
            hint: "Pass at least one test file".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Missing required field: files"));
        assert!(msg.contains("Hint: Pass at least one test file"));
    }

    #[test]
    fn test_config_error_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "frame".to_string(),
            value: "missing.html".to_string(),
            hint: "Custom frame does not exist".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid value for 'frame'"));
        assert!(msg.contains("missing.html"));
    }

    #[test]
    fn test_cli_error_from_config_error() {
        let cli_err: CliError = ConfigError::NotFound(PathBuf::from("x.json")).into();
        assert!(matches!(cli_err, CliError::Config(_)));
    }

    #[test]
    fn test_cli_error_from_bundle_error() {
        let err = harness_bundler::Error::EmptyOutput("run-entry.js".to_string());
        let cli_err: CliError = err.into();
        assert!(matches!(cli_err, CliError::Bundle(_)));
    }

    #[test]
    fn test_result_ext_with_path() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));

        let err = result.with_path("/test/frame.html").unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }

    #[test]
    fn test_result_ext_with_hint() {
        let result: std::result::Result<(), ConfigError> =
            Err(ConfigError::NotFound(PathBuf::from("test.json")));

        let err = result.with_hint("Try creating the file").unwrap_err();
        assert!(err.to_string().contains("Hint: Try creating the file"));
    }

    #[test]
    fn test_result_ext_context() {
        let result: std::result::Result<(), ConfigError> =
            Err(ConfigError::Invalid("port".to_string()));

        let err = result.context("Failed to load config").unwrap_err();
        assert!(err.to_string().starts_with("Failed to load config: "));
    }
}

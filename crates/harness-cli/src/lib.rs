//! Browser test harness server.
//!
//! Bundles test files on demand, serves them to any browser that opens the
//! harness page, restarts connected browsers when files change, and reports
//! results on the console.
//!
//! # Architecture
//!
//! - [`router`] - ordered path matching
//! - [`server`] - HTTP dispatch, embedded assets and request handlers
//! - [`live`] - change bus, connection registry and file watcher
//! - [`session`] - websocket protocol and per-connection task
//! - [`reporter`] - console output for results and failures
//! - [`config`] - layered configuration
//! - [`commands`] - the serve lifecycle
//!
//! # Example
//!
//! ```rust,no_run
//! use harness_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod live;
pub mod logger;
pub mod reporter;
pub mod router;
pub mod server;
pub mod session;
pub mod ui;

pub use error::{CliError, ConfigError, Result, ResultExt};

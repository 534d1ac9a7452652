//! Logging setup for the harness server.
//!
//! Structured logging goes through `tracing`. Operator-facing status lines
//! (server address, bundling failures) go through [`crate::ui`] instead so
//! they stay readable when logging is quiet.
//!
//! # Example
//!
//! ```rust,no_run
//! use harness_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("server starting");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "harness=debug,harness_cli=debug,harness_bundler=debug";
const QUIET_FILTER: &str = "harness=error,harness_cli=error,harness_bundler=error";
const DEFAULT_FILTER: &str = "harness=info,harness_cli=info,harness_bundler=info";

/// Initialize the tracing subscriber.
///
/// Level selection, in order:
/// 1. `--verbose`: DEBUG for harness crates
/// 2. `--quiet`: ERROR only
/// 3. `RUST_LOG`
/// 4. INFO for harness crates
///
/// Must be called once, before any logging happens.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize the logger with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install a panic hook that reports panics on the operator console.
///
/// Panics inside request or connection tasks are caught by the runtime and
/// the server keeps running. With `fail_fast` the process exits with status 1
/// instead.
pub fn install_panic_hook(fail_fast: bool) {
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_else(|| "<unknown>".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Box<dyn Any>".to_string());

        tracing::error!(%location, "panic: {payload}");
        crate::ui::error(&format!("Unexpected error: {payload} ({location})"));

        if fail_fast {
            std::process::exit(1);
        }
    }));
}

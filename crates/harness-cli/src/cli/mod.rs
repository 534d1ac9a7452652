//! Command-line interface for the harness server.
//!
//! `harness [OPTIONS] <FILE>...` bundles the given test files, serves the
//! browser harness and reports results on the console.


use crate::config::ConfigOverrides;
use clap::Parser;
use std::path::PathBuf;

/// Browser test harness - bundle tests, run them in a browser, report here
#[derive(Parser, Debug)]
#[command(
    name = "harness",
    version,
    about = "Run JavaScript tests in a real browser",
    long_about = "harness bundles your test files on demand, serves them to any browser that\n\
                  opens the printed URL and reports results on this console. Connected\n\
                  browsers restart the run whenever a watched file changes."
)]
pub struct Cli {
    /// Test files to bundle, in import order
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Port to listen on [default: 7559]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind [default: localhost]
    #[arg(short = 'o', long)]
    pub host: Option<String>,

    /// Custom HTML frame used instead of the built-in run page
    ///
    /// The bundled tests are appended to the frame as a script tag.
    #[arg(short, long, value_name = "HTML")]
    pub frame: Option<PathBuf>,

    /// Exit after the first result; the exit status is the failure count
    #[arg(long)]
    pub quit: bool,

    /// Shell command to run (and wait for) before the server starts
    #[arg(short, long, value_name = "COMMAND")]
    pub exec: Option<String>,

    /// Working directory for test files and local assets
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Path to a config file [default: ./harness.config.json]
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Upper bound for one build in milliseconds (0 disables it)
    #[arg(long, value_name = "MS")]
    pub build_timeout: Option<u64>,

    /// Exit with status 1 on an unexpected panic
    #[arg(long)]
    pub fail_fast: bool,

    /// Do not restart browsers on file changes
    #[arg(long)]
    pub no_watch: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    /// Configuration values set on the command line.
    ///
    /// Boolean switches only override when they are turned on.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            files: self.files.clone(),
            host: self.host.clone(),
            port: self.port,
            frame: self.frame.clone(),
            quit: self.quit.then_some(true),
            exec: self.exec.clone(),
            cwd: self.cwd.clone(),
            build_timeout_ms: self.build_timeout,
            fail_fast: self.fail_fast.then_some(true),
            watch: self.no_watch.then_some(false),
        }
    }
}

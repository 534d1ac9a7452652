//! Harness server lifecycle.
//!
//! 1. Load and validate configuration
//! 2. Run the pre-start command, if any
//! 3. Materialize the browser app and start the file watcher
//! 4. Serve until an exit is requested or Ctrl+C is pressed

use crate::cli::Cli;
use crate::commands::exec;
use crate::config::HarnessConfig;
use crate::error::{Result, ResultExt};
use crate::live::{ChangeBus, FileWatcher, WatchOptions, pump_changes};
use crate::reporter::TerminalReporter;
use crate::server::{HarnessServer, HarnessState, assets::AppWorkspace, local_addr};
use crate::session::ExitSignal;
use crate::ui;
use harness_bundler::RolldownBundler;
use std::sync::Arc;
use std::time::Duration;

/// Run the harness. Returns the process exit status.
pub async fn execute(cli: Cli) -> Result<i32> {
    let config = HarnessConfig::load(&cli.overrides(), cli.config.as_deref())?;
    config.validate()?;
    crate::logger::install_panic_hook(config.fail_fast);

    let cwd = config.resolved_cwd();
    if let Some(command) = &config.exec {
        exec::run_first(command, &cwd).await;
    }

    let bus = ChangeBus::new();
    let _watcher = if config.watch {
        let options = WatchOptions::new(cwd.clone())
            .ignore(config.watch_ignore.clone())
            .debounce(Duration::from_millis(config.debounce_ms));
        let (watcher, changes) = FileWatcher::start(options)
            .with_hint("Pass --no-watch to serve without live restarts")?;
        tokio::spawn(pump_changes(changes, bus.clone()));
        Some(watcher)
    } else {
        None
    };

    let workspace = AppWorkspace::prepare(&config.files, &cwd).await?;
    let (exit, mut exit_requested) = ExitSignal::channel();
    let host = config.host.clone();
    let state = HarnessState::new(
        config,
        bus,
        Arc::new(RolldownBundler),
        Arc::new(TerminalReporter),
        workspace,
        exit,
    )?;

    let server = HarnessServer::new(state);
    let listener = server.bind().await?;
    let addr = local_addr(&listener)?;
    ui::success(&format!("Visit http://{}:{} to run tests", host, addr.port()));

    let serving = server.serve(listener);
    tokio::pin!(serving);

    tokio::select! {
        result = &mut serving => {
            result?;
            Ok(0)
        }
        code = exit_requested.wait() => Ok(code.unwrap_or(0)),
        _ = tokio::signal::ctrl_c() => {
            ui::info("Shutting down");
            Ok(0)
        }
    }
}

//! Pre-start shell command.

use std::path::Path;
use tokio::process::Command;

/// Run `command` through the platform shell in `cwd` and wait for it.
///
/// Output goes straight to the terminal. A failing or unstartable command is
/// reported and `false` is returned; startup continues either way.
pub async fn run_first(command: &str, cwd: &Path) -> bool {
    tracing::info!(command, "running pre-start command");

    let status = shell(command).current_dir(cwd).status().await;
    match status {
        Ok(status) if status.success() => true,
        Ok(status) => {
            crate::ui::warning(&format!("`{command}` exited with {status}"));
            false
        }
        Err(e) => {
            crate::ui::warning(&format!("Failed to run `{command}`: {e}"));
            false
        }
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

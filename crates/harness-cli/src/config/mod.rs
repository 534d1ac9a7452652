//! Harness configuration with multi-source loading.
//!
//! Priority: CLI > `HARNESS_*` environment > `harness.config.json` > defaults

mod loading;
mod validation;

use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use loading::{CONFIG_FILE_NAME, ConfigOverrides, ENV_PREFIX};

/// URL path of the built-in run frame.
pub const RUN_FRAME_PATH: &str = "/run";

/// Mount point for files served from the working directory.
pub const LOCAL_ASSET_PREFIX: &str = "/assets/in";

/// Harness configuration, loaded from `harness.config.json`, the environment
/// and command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Test files bundled into `/assets/run.js`, in import order.
    pub files: Vec<PathBuf>,

    /// Host the server binds to.
    pub host: String,

    /// Port the server binds to.
    pub port: u16,

    /// Custom HTML frame that replaces the built-in run page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<PathBuf>,

    /// Exit after the first test result, with the failure count as status.
    pub quit: bool,

    /// Shell command run to completion before the server starts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec: Option<String>,

    /// Working directory for resolution and local assets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Upper bound for one build in milliseconds. `0` disables the bound.
    pub build_timeout_ms: u64,

    /// Abort the process on an unexpected panic.
    pub fail_fast: bool,

    /// Restart connected browsers when files under `cwd` change.
    pub watch: bool,

    /// Extra ignore patterns for the watcher.
    pub watch_ignore: Vec<String>,

    /// Debounce window for file changes in milliseconds.
    pub debounce_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            host: "localhost".to_string(),
            port: 7559,
            frame: None,
            quit: false,
            exec: None,
            cwd: None,
            build_timeout_ms: 60_000,
            fail_fast: false,
            watch: true,
            watch_ignore: Vec::new(),
            debounce_ms: 100,
        }
    }
}

impl HarnessConfig {
    /// Working directory, falling back to the process directory.
    pub fn resolved_cwd(&self) -> PathBuf {
        match &self.cwd {
            Some(cwd) if cwd.is_absolute() => cwd.clone(),
            Some(cwd) => std::env::current_dir()
                .map(|dir| dir.join(cwd))
                .unwrap_or_else(|_| cwd.clone()),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Resolve a configured path against the working directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.resolved_cwd().join(path)
        }
    }

    /// Build bound, or `None` when disabled.
    pub fn build_timeout(&self) -> Option<Duration> {
        (self.build_timeout_ms > 0).then(|| Duration::from_millis(self.build_timeout_ms))
    }

    /// URL of the custom frame, if one is configured.
    ///
    /// ```
    /// use harness_cli::config::HarnessConfig;
    ///
    /// let config = HarnessConfig {
    ///     frame: Some("./test/frame.html".into()),
    ///     ..HarnessConfig::default()
    /// };
    /// assert_eq!(config.custom_frame_url().as_deref(), Some("/assets/in/test/frame.html"));
    /// ```
    pub fn custom_frame_url(&self) -> Option<String> {
        let frame = self.frame.as_ref()?;
        let cleaned = PathBuf::from(frame.to_string_lossy().replace('\\', "/")).clean();
        let relative = cleaned.to_string_lossy().replace('\\', "/");
        Some(format!(
            "{LOCAL_ASSET_PREFIX}/{}",
            relative.trim_start_matches("./").trim_start_matches('/')
        ))
    }

    /// URL sent to every browser in the `start` message.
    pub fn start_url(&self) -> String {
        self.custom_frame_url()
            .unwrap_or_else(|| RUN_FRAME_PATH.to_string())
    }
}

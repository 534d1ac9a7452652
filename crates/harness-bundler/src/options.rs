use path_clean::PathClean;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default upper bound for a single build.
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration options for a single on-demand build.
///
/// Builds always target the browser and emit one classic script (IIFE), the
/// form a `<script src>` tag in the harness pages can execute directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Entry module for the build.
    pub entry: PathBuf,

    /// Embed an inline source map (`//# sourceMappingURL=data:...` trailer).
    pub sourcemap: bool,

    /// Working directory for module resolution (default: current directory).
    pub cwd: Option<PathBuf>,

    /// Upper bound for the build. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl BuildOptions {
    /// Create options for a single entry module.
    ///
    /// # Examples
    ///
    /// ```
    /// use harness_bundler::BuildOptions;
    ///
    /// let options = BuildOptions::new("./test/../test/index.js");
    /// assert_eq!(options.entry, std::path::PathBuf::from("test/index.js"));
    /// assert!(!options.sourcemap);
    /// ```
    pub fn new(entry: impl AsRef<Path>) -> Self {
        Self {
            entry: entry.as_ref().to_path_buf().clean(),
            sourcemap: false,
            cwd: None,
            timeout: Some(DEFAULT_BUILD_TIMEOUT),
        }
    }

    /// Enable or disable the inline source map.
    pub fn sourcemap(mut self, enabled: bool) -> Self {
        self.sourcemap = enabled;
        self
    }

    /// Set the working directory used for resolution.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Bound the build duration. `None` disables the bound.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Display name of the entry used in logs and errors.
    pub fn entry_display(&self) -> String {
        self.entry.display().to_string()
    }
}

use crate::config::HarnessConfig;
use crate::error::{ConfigError, Result};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Config file picked up from the current directory.
pub const CONFIG_FILE_NAME: &str = "harness.config.json";

/// Prefix of environment overrides (`HARNESS_PORT`, `HARNESS_QUIT`, ...).
pub const ENV_PREFIX: &str = "HARNESS_";

/// Keys read from the environment. Other `HARNESS_*` variables are ignored.
const ENV_KEYS: &[&str] = &[
    "files",
    "host",
    "port",
    "frame",
    "quit",
    "exec",
    "cwd",
    "build_timeout_ms",
    "fail_fast",
    "watch",
    "watch_ignore",
    "debounce_ms",
];

/// Values given on the command line.
///
/// Only fields that were actually provided are serialized, so unset flags
/// never shadow the file or the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch: Option<bool>,
}

impl HarnessConfig {
    /// Load configuration from every source.
    ///
    /// An explicit `config_path` must exist; the default
    /// `harness.config.json` is only read when present.
    pub fn load(overrides: &ConfigOverrides, config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match config_path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound(path.to_path_buf()).into());
            }
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                default_path.exists().then(|| default_path.to_path_buf())
            }
        };

        if let Some(path) = config_file {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Json::file(path));
        }

        figment = figment
            .merge(Env::prefixed(ENV_PREFIX).only(ENV_KEYS))
            .merge(Serialized::defaults(overrides));

        figment
            .extract()
            .map_err(|e| ConfigError::Invalid(e.to_string()).into())
    }
}

use crate::config::HarnessConfig;
use crate::error::{ConfigError, Result};

impl HarnessConfig {
    /// Validate the merged configuration before the server starts.
    pub fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            return Err(ConfigError::MissingField {
                field: "files".to_string(),
                hint: "Pass at least one test file, e.g. `harness test/index.js`".to_string(),
            }
            .into());
        }

        for file in &self.files {
            if !self.resolve(file).is_file() {
                return Err(ConfigError::InvalidValue {
                    field: "files".to_string(),
                    value: file.display().to_string(),
                    hint: "Test file does not exist relative to the working directory".to_string(),
                }
                .into());
            }
        }

        if let Some(frame) = &self.frame {
            if !self.resolve(frame).is_file() {
                return Err(ConfigError::InvalidValue {
                    field: "frame".to_string(),
                    value: frame.display().to_string(),
                    hint: "Custom frame must be an HTML file relative to the working directory"
                        .to_string(),
                }
                .into());
            }
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".to_string(),
                value: "0".to_string(),
                hint: "Choose a port between 1 and 65535".to_string(),
            }
            .into());
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "host".to_string(),
                hint: "Use `localhost` or an interface address".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn project() -> (tempfile::TempDir, HarnessConfig) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.test.js"), "").unwrap();
        let config = HarnessConfig {
            files: vec![PathBuf::from("a.test.js")],
            cwd: Some(dir.path().to_path_buf()),
            ..HarnessConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn test_valid_config() {
        let (_dir, config) = project();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_files_fails() {
        let (_dir, config) = project();
        let err = HarnessConfig {
            files: vec![],
            ..config
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("Missing required field: files"));
    }

    #[test]
    fn test_missing_test_file_fails() {
        let (_dir, config) = project();
        let err = HarnessConfig {
            files: vec![PathBuf::from("nope.js")],
            ..config
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("nope.js"));
    }

    #[test]
    fn test_missing_frame_fails() {
        let (_dir, config) = project();
        let err = HarnessConfig {
            frame: Some(PathBuf::from("frame.html")),
            ..config
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("'frame'"));
    }

    #[test]
    fn test_zero_port_fails() {
        let (_dir, config) = project();
        assert!(HarnessConfig { port: 0, ..config }.validate().is_err());
    }
}

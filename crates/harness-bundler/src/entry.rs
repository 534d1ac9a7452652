//! Synthesized entry module for multi-file test bundles.

use std::path::{Path, PathBuf};

use crate::Result;

/// File name of the synthesized entry inside the work directory.
pub const ENTRY_MODULE_NAME: &str = "run-entry.js";

/// Render an entry module that imports every test file in order.
///
/// Relative paths are resolved against `cwd` so the module can live anywhere.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use harness_bundler::entry_module_source;
///
/// let src = entry_module_source(&[PathBuf::from("test/a.js")], Path::new("/p"));
/// assert_eq!(src, "import \"/p/test/a.js\";\n");
/// ```
pub fn entry_module_source(files: &[PathBuf], cwd: &Path) -> String {
    files
        .iter()
        .map(|file| {
            let absolute = if file.is_absolute() {
                file.clone()
            } else {
                cwd.join(file)
            };
            // Forward slashes keep Windows paths valid as import specifiers.
            let specifier = absolute.to_string_lossy().replace('\\', "/");
            let quoted = serde_json::to_string(&specifier).unwrap_or_else(|_| "\"\"".to_string());
            format!("import {quoted};\n")
        })
        .collect()
}

/// Write the synthesized entry module into `work_dir` and return its path.
pub async fn write_entry_module(work_dir: &Path, files: &[PathBuf], cwd: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(work_dir).await?;
    let path = work_dir.join(ENTRY_MODULE_NAME);
    tokio::fs::write(&path, entry_module_source(files, cwd)).await?;
    Ok(path)
}

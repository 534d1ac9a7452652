//! Built-in browser application.
//!
//! The harness page, run frame and browser runtime are embedded in the
//! binary. Scripts that need bundling are written into a work directory at
//! startup, so Rolldown can resolve them from disk like any other project.

use crate::error::{CliError, Result, ResultExt};
use harness_bundler::write_entry_module;
use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

#[derive(RustEmbed)]
#[folder = "assets/app"]
struct AppAssets;

#[derive(RustEmbed)]
#[folder = "assets/templates"]
struct TemplateAssets;

/// Generated module holding every HTML template.
pub const TEMPLATES_MODULE: &str = "templates.js";

/// Entry of the harness app bundle inside the work directory.
pub const APP_ENTRY: &str = "index.js";

const APP_DIR: &str = "app";

/// Built-in asset served under `/assets/:file`.
pub fn builtin_asset(name: &str) -> Option<Cow<'static, [u8]>> {
    AppAssets::get(name).map(|file| file.data)
}

/// Built-in HTML template by name (without extension).
pub fn template(name: &str) -> Option<String> {
    TemplateAssets::get(&format!("{name}.html"))
        .map(|file| String::from_utf8_lossy(&file.data).into_owned())
}

/// Replace every `{key}` placeholder with its value.
///
/// Unknown placeholders are left untouched.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{key}}}"), value)
        })
}

/// `export default { "<name>": "<html>", ... }` for every template.
pub fn templates_module() -> String {
    let mut names: Vec<String> = TemplateAssets::iter()
        .filter(|path| path.ends_with(".html"))
        .map(|path| path.into_owned())
        .collect();
    names.sort();

    let mut out = String::from("export default {\n");
    for path in names {
        let Some(file) = TemplateAssets::get(&path) else {
            continue;
        };
        let name = path.trim_end_matches(".html");
        let html = String::from_utf8_lossy(&file.data);
        out.push_str(&format!(
            "  {}: {},\n",
            serde_json::Value::from(name),
            serde_json::Value::from(html.as_ref())
        ));
    }
    out.push_str("};\n");
    out
}

/// Content type by file extension.
pub fn content_type(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "js" | "mjs" | "cjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Work directory holding the materialized app and the synthesized test
/// entry. Removed when dropped.
///
/// Everything is written once by [`AppWorkspace::prepare`]. Builds only read
/// from it, so concurrent requests never see a partially written module.
#[derive(Debug)]
pub struct AppWorkspace {
    dir: tempfile::TempDir,
    run_entry: PathBuf,
}

impl AppWorkspace {
    /// Create a fresh work directory holding the app scripts, the template
    /// module and an entry importing `files` (relative to `cwd`).
    pub async fn prepare(files: &[PathBuf], cwd: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("harness-")
            .tempdir()
            .context("Failed to create the harness work directory")?;
        let root = dir.path();

        let app_dir = root.join(APP_DIR);
        tokio::fs::create_dir_all(&app_dir).await?;
        for name in AppAssets::iter().filter(|name| name.ends_with(".js")) {
            let Some(file) = AppAssets::get(&name) else {
                continue;
            };
            let target = app_dir.join(name.as_ref());
            tokio::fs::write(&target, file.data.as_ref())
                .await
                .with_path(&target)?;
        }

        let templates = app_dir.join(TEMPLATES_MODULE);
        tokio::fs::write(&templates, templates_module())
            .await
            .map_err(CliError::from)
            .with_path(&templates)?;

        let run_entry = write_entry_module(root, files, cwd).await?;

        tracing::debug!(
            root = %root.display(),
            files = files.len(),
            "prepared harness work directory"
        );
        Ok(Self { dir, run_entry })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn app_dir(&self) -> PathBuf {
        self.root().join(APP_DIR)
    }

    pub fn app_entry(&self) -> PathBuf {
        self.app_dir().join(APP_ENTRY)
    }

    /// Entry module importing every test file in order.
    pub fn run_entry(&self) -> &Path {
        &self.run_entry
    }
}

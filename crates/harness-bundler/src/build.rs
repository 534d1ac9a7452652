//! Build execution against Rolldown.

use async_trait::async_trait;
use rolldown::{BundlerBuilder, BundlerOptions, InputItem, OutputFormat, Platform, SourceMapType};
use rolldown_common::Output;
use std::time::Instant;

use crate::{BuildOptions, Error, Result};

/// Produces a browser-executable bundle from an entry module.
///
/// The harness server depends on this trait rather than on Rolldown so that
/// request handling can be exercised without a real build.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Build the bundle and return its text.
    async fn bundle(&self, options: BuildOptions) -> Result<String>;

    /// [`bundle`](Bundler::bundle), bounded by `options.timeout`.
    async fn bundle_bounded(&self, options: BuildOptions) -> Result<String> {
        let limit = options.timeout;
        match limit {
            Some(limit) => tokio::time::timeout(limit, self.bundle(options))
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => self.bundle(options).await,
        }
    }
}

/// [`Bundler`] backed by Rolldown. Every call is a fresh build.
///
/// `bundle` ignores `options.timeout`; call `bundle_bounded` to enforce it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolldownBundler;

#[async_trait]
impl Bundler for RolldownBundler {
    async fn bundle(&self, options: BuildOptions) -> Result<String> {
        execute_build(&options).await
    }
}

async fn execute_build(options: &BuildOptions) -> Result<String> {
    let start = Instant::now();
    let entry = options.entry_display();

    let cwd = match &options.cwd {
        Some(cwd) => cwd.clone(),
        None => std::env::current_dir()?,
    };

    let rolldown_options = BundlerOptions {
        input: Some(vec![InputItem {
            name: None,
            import: entry.clone(),
        }]),
        cwd: Some(cwd),
        format: Some(OutputFormat::Iife),
        platform: Some(Platform::Browser),
        sourcemap: options.sourcemap.then_some(SourceMapType::Inline),
        ..Default::default()
    };

    let mut bundler = BundlerBuilder::default()
        .with_options(rolldown_options)
        .build()
        .map_err(|e| Error::from_rolldown_batch(&e))?;

    let output = bundler
        .generate()
        .await
        .map_err(|e| Error::from_rolldown_batch(&e))?;

    let code = output
        .assets
        .iter()
        .find_map(|item| match item {
            Output::Chunk(chunk) if chunk.is_entry => Some(chunk.code.clone()),
            _ => None,
        })
        .ok_or_else(|| Error::EmptyOutput(entry.clone()))?;

    tracing::debug!(
        entry = %entry,
        bytes = code.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "bundle built"
    );

    Ok(code)
}

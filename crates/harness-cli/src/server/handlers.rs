//! Request handlers.
//!
//! Failures never tear down a connection: a broken bundle is reported on the
//! console and served as an empty script, a missing file is a 404.

use super::assets::{self, content_type};
use super::{Endpoint, SharedState};
use crate::error::miette::render_bundle_error;
use crate::router::Params;
use crate::session::{ServerMessage, run_session};
use axum::{
    body::Body,
    extract::{
        State,
        ws::{WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use harness_bundler::{BuildOptions, inject_source_capture};
use path_clean::PathClean;
use std::convert::Infallible;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

const JAVASCRIPT: &str = "application/javascript; charset=utf-8";
const HTML: &str = "text/html; charset=utf-8";
const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Tag appended to custom frames.
pub const RUN_SCRIPT_TAG: &str = r#"<script type="text/javascript" src="/assets/run.js"></script>"#;

/// Single entry point for every request.
pub(super) async fn dispatch(
    State(state): State<SharedState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    uri: Uri,
) -> Response {
    if let Ok(upgrade) = upgrade {
        let registry = state.registry.clone();
        let handler = state.session.clone();
        let start_url = state.config.start_url();
        return upgrade.on_upgrade(move |socket| run_session(socket, registry, handler, start_url));
    }

    let Some(matched) = state.routes.match_path(uri.path()) else {
        tracing::debug!(path = uri.path(), "no route");
        return not_found();
    };

    match matched.handler {
        Endpoint::Index => index(),
        Endpoint::AppBundle => app_bundle(&state).await,
        Endpoint::RunBundle => run_bundle(&state).await,
        Endpoint::BuiltinAsset => builtin_asset(&matched.params),
        Endpoint::LocalAsset => local_asset(&state, &matched.params).await,
        Endpoint::RunFrame => run_frame(),
        Endpoint::CustomFrame(frame) => custom_frame(&state, frame).await,
        Endpoint::Restart => restart(&state),
    }
}

fn respond(content_type: &'static str, body: impl Into<Body>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body.into(),
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, PLAIN_TEXT)],
        "Not Found",
    )
        .into_response()
}

/// `waiting` layout wrapped into the app page.
fn index() -> Response {
    let waiting = assets::template("waiting").unwrap_or_default();
    let waiting = assets::render_template(&waiting, &[("message", "loading")]);

    match assets::builtin_asset("index.html") {
        Some(page) => {
            let page = String::from_utf8_lossy(&page);
            respond(HTML, assets::render_template(&page, &[("layout", &waiting)]))
        }
        None => not_found(),
    }
}

async fn app_bundle(state: &SharedState) -> Response {
    let options = BuildOptions::new(state.workspace.app_entry())
        .cwd(state.workspace.app_dir())
        .timeout(state.config.build_timeout());

    let code = build(state, "the harness app", options).await.unwrap_or_default();
    respond(JAVASCRIPT, code)
}

async fn run_bundle(state: &SharedState) -> Response {
    let options = BuildOptions::new(state.workspace.run_entry())
        .sourcemap(true)
        .cwd(state.cwd.clone())
        .timeout(state.config.build_timeout());

    let body = match build(state, "the test files", options).await {
        Some(code) => inject_source_capture(&code),
        None => String::new(),
    };
    respond(JAVASCRIPT, body)
}

/// Run one build, reporting failures on the console.
async fn build(state: &SharedState, what: &str, options: BuildOptions) -> Option<String> {
    let started = Instant::now();
    match state.bundler.bundle_bounded(options).await {
        Ok(code) => {
            tracing::info!(
                "bundled {what} ({}) in {}",
                crate::ui::format_size(code.len() as u64),
                crate::ui::format_duration(started.elapsed())
            );
            Some(code)
        }
        Err(e) => {
            report_build_failure(what, &e);
            None
        }
    }
}

fn report_build_failure(what: &str, err: &harness_bundler::Error) {
    tracing::debug!("bundling {what} failed: {err}");
    crate::ui::error(&format!("Failed to bundle {what}"));
    eprintln!("{}", render_bundle_error(err));
}

fn builtin_asset(params: &Params) -> Response {
    let Some(file) = params.get("file") else {
        return not_found();
    };
    match assets::builtin_asset(file) {
        Some(data) => respond(content_type(file), data.into_owned()),
        None => not_found(),
    }
}

async fn local_asset(state: &SharedState, params: &Params) -> Response {
    let Some(path) = params.get("filename").and_then(|name| contained_path(&state.cwd, name))
    else {
        return not_found();
    };

    match tokio::fs::read(&path).await {
        Ok(data) => respond(content_type(&path.to_string_lossy()), data),
        Err(e) => {
            tracing::debug!(path = %path.display(), "local asset not readable: {e}");
            not_found()
        }
    }
}

/// `root`-relative path that stays inside `root`.
fn contained_path(root: &Path, relative: &str) -> Option<PathBuf> {
    let cleaned = PathBuf::from(relative).clean();
    let escapes = cleaned
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    (!escapes).then(|| root.join(cleaned))
}

fn run_frame() -> Response {
    match assets::builtin_asset("frame.html") {
        Some(page) => respond(HTML, page.into_owned()),
        None => not_found(),
    }
}

async fn custom_frame(state: &SharedState, frame: &Path) -> Response {
    let path = state.config.resolve(frame);
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => respond(HTML, append_run_script(&html)),
        Err(e) => {
            tracing::error!(path = %path.display(), "failed to read custom frame: {e}");
            crate::ui::error(&format!(
                "Failed to read custom frame {}: {e}",
                path.display()
            ));
            (StatusCode::INTERNAL_SERVER_ERROR, [(header::CONTENT_TYPE, HTML)], "").into_response()
        }
    }
}

/// User HTML followed by the test bundle script tag.
pub fn append_run_script(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + RUN_SCRIPT_TAG.len() + 1);
    out.push_str(html);
    if !html.is_empty() && !html.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(RUN_SCRIPT_TAG);
    out
}

/// Restart every browser and stream one line per notified connection.
fn restart(state: &SharedState) -> Response {
    let notified = state.registry.broadcast(&ServerMessage::restart()).len();
    tracing::info!(browsers = notified, "manual restart");

    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>("restarting...\n".to_string());
        for n in 1..=notified {
            yield Ok(format!("{n}\n"));
        }
        yield Ok("done\n".to_string());
    };
    respond(PLAIN_TEXT, Body::from_stream(stream))
}

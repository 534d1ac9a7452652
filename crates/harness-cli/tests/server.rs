//! End-to-end tests for the harness server over real HTTP and websockets.
//!
//! Builds are served by an in-memory bundler so no Rolldown run is needed.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use harness_bundler::{BuildOptions, Bundler};
use harness_cli::config::HarnessConfig;
use harness_cli::live::ChangeBus;
use harness_cli::reporter::ConsoleReporter;
use harness_cli::server::{HarnessServer, HarnessState, SharedState, assets::AppWorkspace};
use harness_cli::session::{ExitReceiver, ExitSignal, FailMessage, ResultMessage};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const BUNDLE: &str = "(function(){ test('adds', function(){}); })();\n//# sourceMappingURL=data:application/json;base64,e30=\n";
const TAG: &str = r#"<script type="text/javascript" src="/assets/run.js"></script>"#;

#[derive(Clone, Copy)]
enum Build {
    /// Always returns [`BUNDLE`].
    Fixed,
    /// Fails with a resolve diagnostic.
    Broken,
    /// Returns the entry module read from disk, as a real bundler would.
    Entry,
    /// Sleeps past any reasonable build bound.
    Stalled,
}

struct FakeBundler {
    build: Build,
}

#[async_trait]
impl Bundler for FakeBundler {
    async fn bundle(&self, options: BuildOptions) -> harness_bundler::Result<String> {
        match self.build {
            Build::Fixed => Ok(BUNDLE.to_string()),
            Build::Broken => Err(harness_bundler::Error::from_rolldown_batch(
                &"UnresolvedImport: Could not resolve './missing.js'",
            )),
            Build::Entry => Ok(tokio::fs::read_to_string(&options.entry).await?),
            Build::Stalled => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(BUNDLE.to_string())
            }
        }
    }
}

#[derive(Default)]
struct Recording {
    results: Mutex<Vec<ResultMessage>>,
    failures: Mutex<Vec<FailMessage>>,
}

impl ConsoleReporter for Recording {
    fn result(&self, message: &ResultMessage) {
        self.results.lock().unwrap().push(message.clone());
    }

    fn failure(&self, message: &FailMessage) {
        self.failures.lock().unwrap().push(message.clone());
    }
}

struct TestServer {
    addr: SocketAddr,
    state: SharedState,
    reporter: Arc<Recording>,
    exit: ExitReceiver,
    project: TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn connect(&self) -> Socket {
        let (socket, _) = connect_async(format!("ws://{}/", self.addr)).await.unwrap();
        socket
    }

    async fn wait_for_connections(&self, expected: usize) {
        for _ in 0..100 {
            if self.state.registry.len() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "expected {expected} connections, found {}",
            self.state.registry.len()
        );
    }
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.test.js"), "test('adds', function(){});\n").unwrap();
    std::fs::write(dir.path().join("frame.html"), "<html><body>custom</body></html>").unwrap();
    std::fs::write(dir.path().join("data.json"), r#"{"ok":true}"#).unwrap();
    dir
}

async fn start_with(configure: impl FnOnce(&mut HarnessConfig), build: Build) -> TestServer {
    let project = project();
    let mut config = HarnessConfig {
        files: vec![PathBuf::from("a.test.js")],
        cwd: Some(project.path().to_path_buf()),
        watch: false,
        ..HarnessConfig::default()
    };
    configure(&mut config);

    let reporter = Arc::new(Recording::default());
    let (exit_signal, exit) = ExitSignal::channel();
    let workspace = AppWorkspace::prepare(&config.files, &config.resolved_cwd())
        .await
        .unwrap();
    let state = HarnessState::new(
        config,
        ChangeBus::new(),
        Arc::new(FakeBundler { build }),
        reporter.clone(),
        workspace,
        exit_signal,
    )
    .unwrap();

    let server = HarnessServer::new(state);
    let state = server.state().clone();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener));

    TestServer {
        addr,
        state,
        reporter,
        exit,
        project,
    }
}

async fn start() -> TestServer {
    start_with(|_| {}, Build::Fixed).await
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a message")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn assert_silent(socket: &mut Socket) {
    let next = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
    assert!(next.is_err(), "unexpected message: {next:?}");
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let server = start().await;

    let response = reqwest::get(server.url("/does-not-exist")).await.unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(response.text().await.unwrap(), "Not Found");
}

#[tokio::test]
async fn test_index_renders_waiting_layout() {
    let server = start().await;

    let response = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("loading..."));
    assert!(body.contains("/assets/app.js"));
    assert!(!body.contains("{layout}"));
}

#[tokio::test]
async fn test_run_bundle_has_source_capture_before_source_map() {
    let server = start().await;

    let response = reqwest::get(server.url("/assets/run.js?t=1")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/javascript")
    );

    let body = response.text().await.unwrap();
    let capture = body
        .find("window.__source_code = window.parent.__source_code = ")
        .unwrap();
    let marker = body.rfind("//# sourceMappingURL").unwrap();
    assert!(capture < marker);
    assert!(body.starts_with("(function(){ test('adds'"));
}

#[tokio::test]
async fn test_failed_build_serves_empty_script() {
    let server = start_with(|_| {}, Build::Broken).await;

    for path in ["/assets/run.js", "/assets/app.js"] {
        let response = reqwest::get(server.url(path)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "");
    }
}

#[tokio::test]
async fn test_concurrent_run_bundles_see_the_full_entry() {
    let files: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("test/{i}.test.js"))).collect();
    let expected = files.len();
    let server = start_with(move |c| c.files = files, Build::Entry).await;

    let client = reqwest::Client::new();
    let requests = (0..64).map(|_| {
        let request = client.get(server.url("/assets/run.js"));
        async move { request.send().await.unwrap().text().await.unwrap() }
    });

    for body in futures::future::join_all(requests).await {
        let imports = body.lines().filter(|line| line.starts_with("import ")).count();
        assert_eq!(imports, expected);
    }
}

#[tokio::test]
async fn test_stalled_build_is_served_empty_after_timeout() {
    let server = start_with(|c| c.build_timeout_ms = 100, Build::Stalled).await;

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        reqwest::get(server.url("/assets/run.js")),
    )
    .await
    .expect("build was not bounded")
    .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "");
}

#[tokio::test]
async fn test_builtin_assets() {
    let server = start().await;

    let frame = reqwest::get(server.url("/run")).await.unwrap();
    assert_eq!(frame.status(), 200);
    assert!(frame.text().await.unwrap().contains("/assets/run.js"));

    let css = reqwest::get(server.url("/assets/style.css")).await.unwrap();
    assert_eq!(css.headers()["content-type"], "text/css; charset=utf-8");

    let missing = reqwest::get(server.url("/assets/nope.js")).await.unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn test_local_assets_are_served_from_cwd() {
    let server = start().await;

    let response = reqwest::get(server.url("/assets/in/data.json")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), r#"{"ok":true}"#);

    let missing = reqwest::get(server.url("/assets/in/missing.json")).await.unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn test_custom_frame_gets_run_script_once() {
    let server = start_with(|c| c.frame = Some(PathBuf::from("frame.html")), Build::Fixed).await;

    let body = reqwest::get(server.url("/assets/in/frame.html"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.starts_with("<html><body>custom</body></html>"));
    assert_eq!(body.matches(TAG).count(), 1);

    let mut socket = server.connect().await;
    assert_eq!(
        next_json(&mut socket).await,
        json!({ "start": true, "url": "/assets/in/frame.html" })
    );
}

#[tokio::test]
async fn test_unreadable_custom_frame_is_server_error() {
    let server = start_with(|c| c.frame = Some(PathBuf::from("frame.html")), Build::Fixed).await;
    std::fs::remove_file(server.project.path().join("frame.html")).unwrap();

    let response = reqwest::get(server.url("/assets/in/frame.html")).await.unwrap();
    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), "");
}

#[tokio::test]
async fn test_session_starts_with_run_frame() {
    let server = start().await;

    let mut socket = server.connect().await;
    assert_eq!(
        next_json(&mut socket).await,
        json!({ "start": true, "url": "/run" })
    );
    server.wait_for_connections(1).await;
}

#[tokio::test]
async fn test_any_path_accepts_websocket_sessions() {
    let server = start().await;

    let (mut socket, _) = connect_async(format!("ws://{}/some/other/path", server.addr))
        .await
        .unwrap();
    assert_eq!(next_json(&mut socket).await["start"], true);
}

#[tokio::test]
async fn test_manual_restart_streams_one_line_per_connection() {
    let server = start().await;

    let mut sockets = Vec::new();
    for _ in 0..3 {
        let mut socket = server.connect().await;
        next_json(&mut socket).await;
        sockets.push(socket);
    }

    let body = reqwest::get(server.url("/restart"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "restarting...\n1\n2\n3\ndone\n");

    for socket in &mut sockets {
        assert_eq!(next_json(socket).await, json!({ "restart": true }));
    }
}

#[tokio::test]
async fn test_restart_without_connections() {
    let server = start().await;

    let body = reqwest::get(server.url("/restart"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "restarting...\ndone\n");
}

#[tokio::test]
async fn test_change_event_restarts_every_browser() {
    let server = start().await;

    let mut first = server.connect().await;
    let mut second = server.connect().await;
    next_json(&mut first).await;
    next_json(&mut second).await;

    server.state.bus.publish();

    assert_eq!(next_json(&mut first).await, json!({ "restart": true }));
    assert_eq!(next_json(&mut second).await, json!({ "restart": true }));
}

#[tokio::test]
async fn test_closed_connection_is_removed() {
    let server = start().await;

    let mut leaving = server.connect().await;
    let mut staying = server.connect().await;
    next_json(&mut leaving).await;
    next_json(&mut staying).await;
    server.wait_for_connections(2).await;

    leaving.close(None).await.unwrap();
    server.wait_for_connections(1).await;

    let body = reqwest::get(server.url("/restart"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "restarting...\n1\ndone\n");
    assert_eq!(next_json(&mut staying).await, json!({ "restart": true }));
}

#[tokio::test]
async fn test_result_with_quit_requests_exit_code() {
    let mut server = start_with(|c| c.quit = true, Build::Fixed).await;

    let mut socket = server.connect().await;
    next_json(&mut socket).await;
    socket
        .send(Message::Text(
            json!({ "result": { "failed": 2, "passed": 3 }, "userAgent": "test" })
                .to_string()
                .into(),
        ))
        .await
        .unwrap();

    let code = tokio::time::timeout(Duration::from_secs(5), server.exit.wait())
        .await
        .unwrap();
    assert_eq!(code, Some(2));
    assert_eq!(server.reporter.results.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failures_are_reported_and_junk_is_ignored() {
    let mut server = start().await;

    let mut socket = server.connect().await;
    next_json(&mut socket).await;

    socket.send(Message::Text("not json".into())).await.unwrap();
    socket
        .send(Message::Binary(vec![1, 2, 3].into()))
        .await
        .unwrap();
    socket
        .send(Message::Text(
            json!({ "fail": { "name": "AssertionError", "test": "adds" }, "userAgent": "ua" })
                .to_string()
                .into(),
        ))
        .await
        .unwrap();

    for _ in 0..100 {
        if !server.reporter.failures.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let failures = server.reporter.failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].fail.test, "adds");
    assert!(server.reporter.results.lock().unwrap().is_empty());
    drop(failures);

    // No acknowledgement is ever sent.
    assert_silent(&mut socket).await;
    let exit = tokio::time::timeout(Duration::from_millis(100), server.exit.wait()).await;
    assert!(exit.is_err(), "unexpected exit request: {exit:?}");
}

//! HTTP and websocket server for the harness.
//!
//! Every request goes through one dispatcher: websocket upgrades become
//! sessions regardless of path, everything else is looked up in the ordered
//! [`RouteTable`].

pub mod assets;
mod handlers;

use crate::config::{HarnessConfig, LOCAL_ASSET_PREFIX, RUN_FRAME_PATH};
use crate::error::{CliError, Result};
use crate::live::{ChangeBus, ConnectionRegistry, spawn_reload_forwarder};
use crate::reporter::ConsoleReporter;
use crate::router::{RouteError, RouteTable};
use crate::session::{ExitSignal, SessionHandler};
use assets::AppWorkspace;
use axum::Router;
use harness_bundler::Bundler;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// What a matched route serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Landing page.
    Index,
    /// Bundled harness application.
    AppBundle,
    /// Bundled tests with source capture.
    RunBundle,
    /// Embedded asset named by the `file` parameter.
    BuiltinAsset,
    /// File under the working directory named by the `filename` parameter.
    LocalAsset,
    /// Built-in run frame.
    RunFrame,
    /// User frame with the test bundle appended.
    CustomFrame(PathBuf),
    /// Manual restart of every browser.
    Restart,
}

/// Route table in registration order.
pub fn build_routes(config: &HarnessConfig) -> Result<RouteTable<Endpoint>, RouteError> {
    let mut routes = RouteTable::new()
        .route("/assets/app.js", Endpoint::AppBundle)?
        .route("/assets/run.js", Endpoint::RunBundle)?
        .route("/assets/:file", Endpoint::BuiltinAsset)?
        .route(RUN_FRAME_PATH, Endpoint::RunFrame)?
        .route("/", Endpoint::Index)?;

    if let (Some(frame), Some(url)) = (&config.frame, config.custom_frame_url()) {
        routes.add(&url, Endpoint::CustomFrame(frame.clone()))?;
    }

    routes.add(
        &format!("{LOCAL_ASSET_PREFIX}/:filename([\\w./-]+)"),
        Endpoint::LocalAsset,
    )?;
    routes.add("/restart", Endpoint::Restart)?;
    Ok(routes)
}

/// Everything a request or session needs.
pub struct HarnessState {
    pub config: HarnessConfig,
    pub cwd: PathBuf,
    pub routes: RouteTable<Endpoint>,
    pub registry: Arc<ConnectionRegistry>,
    pub bus: ChangeBus,
    pub bundler: Arc<dyn Bundler>,
    pub session: SessionHandler,
    pub workspace: AppWorkspace,
}

pub type SharedState = Arc<HarnessState>;

impl HarnessState {
    pub fn new(
        config: HarnessConfig,
        bus: ChangeBus,
        bundler: Arc<dyn Bundler>,
        reporter: Arc<dyn ConsoleReporter>,
        workspace: AppWorkspace,
        exit: ExitSignal,
    ) -> Result<Self> {
        let routes = build_routes(&config)?;
        let session = SessionHandler::new(reporter, config.quit, exit);
        Ok(Self {
            cwd: config.resolved_cwd(),
            config,
            routes,
            registry: Arc::new(ConnectionRegistry::new()),
            bus,
            bundler,
            session,
            workspace,
        })
    }
}

/// The harness server.
pub struct HarnessServer {
    state: SharedState,
}

impl HarnessServer {
    pub fn new(state: HarnessState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Bind the configured host and port.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = (self.state.config.host.as_str(), self.state.config.port);
        TcpListener::bind(addr).await.map_err(|e| {
            CliError::Server(format!(
                "Failed to bind to {}:{}: {}",
                self.state.config.host, self.state.config.port, e
            ))
        })
    }

    /// Axum router: one dispatcher plus permissive CORS.
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(handlers::dispatch)
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.state.clone())
    }

    /// Serve on `listener` until the process exits.
    ///
    /// Changes published on the bus are forwarded to connected browsers for
    /// as long as the server runs.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let addr = local_addr(&listener)?;
        tracing::debug!(%addr, "harness server listening");

        let forwarder = spawn_reload_forwarder(&self.state.bus, self.state.registry.clone());
        let app = self.router();
        let result = axum::serve(listener, app)
            .await
            .map_err(|e| CliError::Server(format!("Server error: {e}")));
        forwarder.abort();
        result
    }
}

/// Address a listener is bound to.
pub fn local_addr(listener: &TcpListener) -> Result<SocketAddr> {
    listener
        .local_addr()
        .map_err(|e| CliError::Server(format!("Failed to read local address: {e}")))
}

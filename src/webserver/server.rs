/// Fixture server lifecycle
///
/// `FixtureServer` owns the connection registry and the accept loop task.
/// There is no module-level state: a test harness can run several servers
/// side by side on ephemeral ports.
use axum::{middleware, Router};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;

use crate::{
    config::FixtureConfig,
    errors::FixtureError,
    logger::{self, LogTag},
    webserver::{
        listener, middleware::one_request_per_connection, routes, state::AppState,
        ws::ConnectionRegistry,
    },
};

struct RunningServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct FixtureServer {
    config: FixtureConfig,
    registry: Arc<ConnectionRegistry>,
    running: Option<RunningServer>,
}

impl FixtureServer {
    /// Idle server; nothing is bound until `start`
    pub fn new(config: FixtureConfig) -> Self {
        let registry = ConnectionRegistry::new(
            config.server.ws_buffer_size,
            config.server.default_wait_timeout(),
        );

        Self {
            config,
            registry,
            running: None,
        }
    }

    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    /// Registry the correlation layer operates on
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    /// `http://host:port` of the running listener
    pub fn base_url(&self) -> Option<String> {
        self.local_addr().map(|addr| format!("http://{}", addr))
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Bind `host:port` and start serving; port 0 picks an ephemeral port
    ///
    /// Starting an already running server is a no-op that returns the
    /// existing address.
    pub async fn start(&mut self, port: u16) -> Result<SocketAddr, FixtureError> {
        if let Some(running) = &self.running {
            logger::warning(
                LogTag::Webserver,
                &format!("Server already running on {}", running.addr),
            );
            return Ok(running.addr);
        }

        let host: IpAddr = self.config.server.host.parse().map_err(|e| {
            FixtureError::InvalidAddress(format!("{}: {}", self.config.server.host, e))
        })?;
        let requested = SocketAddr::new(host, port);

        let listener = TcpListener::bind(requested).await.map_err(|e| {
            log_bind_failure(requested, &e);
            FixtureError::Bind {
                addr: requested,
                source: e,
            }
        })?;
        let addr = listener.local_addr()?;

        // Previous run's connections were terminated by `stop`
        self.registry.reopen();

        let state = Arc::new(AppState::new(&self.config, Arc::clone(&self.registry)));
        let faults = Arc::clone(&state.faults);
        let app = build_app(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(listener::run_accept_loop(listener, app, faults, shutdown_rx));

        logger::info(
            LogTag::Webserver,
            &format!("Server running at http://{}", addr),
        );
        logger::info(
            LogTag::Webserver,
            &format!("WebSocket server running at ws://{}", addr),
        );

        self.running = Some(RunningServer {
            addr,
            shutdown_tx,
            task,
        });
        Ok(addr)
    }

    /// Terminate WebSocket clients, stop accepting, abort in-flight requests
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            logger::debug(LogTag::Webserver, "Stop requested on idle server");
            return;
        };

        let terminated = self.registry.close_all();
        let _ = running.shutdown_tx.send(());

        if let Err(e) = running.task.await {
            logger::warning(
                LogTag::Webserver,
                &format!("Accept loop ended abnormally: {}", e),
            );
        }

        logger::info(
            LogTag::Webserver,
            &format!(
                "Server on {} stopped ({} websocket client(s) terminated)",
                running.addr, terminated
            ),
        );
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            self.registry.close_all();
            let _ = running.shutdown_tx.send(());
            running.task.abort();
        }
    }
}

/// Build the axum application with all routes and middleware
fn build_app(state: Arc<AppState>) -> Router {
    routes::create_router(state)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(one_request_per_connection))
}

fn log_bind_failure(addr: SocketAddr, e: &std::io::Error) {
    match e.kind() {
        std::io::ErrorKind::AddrInUse => logger::error(
            LogTag::Webserver,
            &format!(
                "Failed to bind to {}: Address already in use\n\
                 \n\
                 Another fixture server (or the app's dev server) may hold the port.\n\
                 Pass --port 0 for an ephemeral port, or stop the other process:\n\
                   lsof -i :{}",
                addr,
                addr.port()
            ),
        ),
        std::io::ErrorKind::PermissionDenied => logger::error(
            LogTag::Webserver,
            &format!(
                "Failed to bind to {}: Permission denied\n\
                 \n\
                 Port {} requires elevated privileges on this system.\n\
                 Consider using a port above 1024.",
                addr,
                addr.port()
            ),
        ),
        _ => logger::error(
            LogTag::Webserver,
            &format!("Failed to bind to {}: {}", addr, e),
        ),
    }
}

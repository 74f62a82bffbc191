// src/server/mod.rs

//! Development HTTP server.
//!
//! Serves the output root as static files. With live reload on, HTML pages
//! get a script that subscribes to [`livereload::EVENTS_PATH`]; calling
//! [`LiveReload::reload`] refreshes every connected browser.

pub mod livereload;
pub mod static_files;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::model::ServerSection;
use crate::errors::{AssetdagError, Result};

pub use livereload::LiveReload;

#[derive(Debug)]
struct ServerState {
    root: PathBuf,
    livereload: Option<LiveReload>,
}

/// A bound, not yet serving, dev server.
#[derive(Debug)]
pub struct DevServer {
    listener: TcpListener,
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl DevServer {
    /// Bind `host:port`. An address already in use is a
    /// [`AssetdagError::ServerBind`] and is not retried.
    pub async fn bind(root: impl Into<PathBuf>, server: &ServerSection) -> Result<Self> {
        let addr = resolve_addr(&server.host, server.port).await?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AssetdagError::ServerBind { addr, source })?;
        let addr = listener.local_addr()?;

        let state = Arc::new(ServerState {
            root: root.into(),
            livereload: server.livereload.then(LiveReload::new),
        });

        Ok(Self {
            listener,
            addr,
            state,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn live_reload(&self) -> Option<LiveReload> {
        self.state.livereload.clone()
    }

    /// Start serving in the background.
    pub fn spawn(self) -> DevServerHandle {
        let router = router(Arc::clone(&self.state));
        let addr = self.addr;
        let root = self.state.root.clone();
        let listener = self.listener;

        info!(%addr, root = ?root, "dev server listening");
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                error!(%addr, error = %err, "dev server stopped");
            }
        });

        DevServerHandle { addr, task }
    }
}

/// Running server; dropping it stops serving.
#[derive(Debug)]
pub struct DevServerHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl DevServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for DevServerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn router(state: Arc<ServerState>) -> Router {
    let mut router = Router::new();
    if state.livereload.is_some() {
        router = router
            .route(livereload::EVENTS_PATH, get(reload_events))
            .route(livereload::SCRIPT_PATH, get(reload_script));
    }
    router.fallback(static_file).with_state(state)
}

async fn reload_events(State(state): State<Arc<ServerState>>) -> Response {
    match &state.livereload {
        Some(lr) => lr.event_stream().into_response(),
        None => axum::http::StatusCode::NOT_FOUND.into_response(),
    }
}

async fn reload_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        livereload::CLIENT_SCRIPT,
    )
}

async fn static_file(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    static_files::serve_file(&state.root, uri.path(), state.livereload.is_some()).await
}

async fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| AssetdagError::ConfigError(format!("invalid server host '{host}': {e}")))?;
    addrs
        .next()
        .ok_or_else(|| AssetdagError::ConfigError(format!("server host '{host}' did not resolve")))
}

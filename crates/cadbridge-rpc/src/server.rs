//! Transport endpoint
//!
//! `POST /rpc` takes one JSON-RPC request and answers with one response.
//! `GET /health` answers `OK` without touching the owning context.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::dispatcher::Dispatcher;
use crate::protocol::{PARSE_ERROR, Params, Request, Response, RpcError};

/// Build the HTTP router for a dispatcher
pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/rpc", post(rpc_handler))
        .with_state(Arc::new(dispatcher))
        .layer(TraceLayer::new_for_http())
}

async fn rpc_handler(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Json<Response> {
    Json(handle(&dispatcher, &body).await)
}

/// Decode, dispatch and frame a single request body
pub async fn handle(dispatcher: &Dispatcher, body: &[u8]) -> Response {
    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return Response::failure(Value::Null, RpcError::new(PARSE_ERROR, e.to_string())),
    };

    let request = match Request::from_value(value) {
        Ok(r) => r,
        Err(response) => return *response,
    };

    let result = match Params::from_value(request.params) {
        Ok(params) => dispatcher.call(&request.method, &params).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(envelope) => Response::success(request.id, envelope),
        Err(e) => {
            tracing::warn!("Rejected call to '{}': {}", request.method, e);
            Response::failure(request.id, e)
        }
    }
}

/// A running server
pub struct RpcServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl RpcServer {
    /// Bind `addr` and start serving; port 0 picks a free port
    pub async fn bind(dispatcher: Dispatcher, addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        let addr = listener.local_addr().context("Failed to read bound address")?;

        let (tx, rx) = oneshot::channel::<()>();
        let app = router(dispatcher);
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
        });

        tracing::info!("Bridge listening at http://{}/rpc", addr);
        Ok(Self {
            addr,
            shutdown: Some(tx),
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL of the RPC endpoint
    pub fn url(&self) -> String {
        format!("http://{}/rpc", self.addr)
    }

    /// Stop accepting connections and wait for in-flight calls
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task.await.context("Server task failed")??;
        tracing::info!("Bridge at {} stopped", self.addr);
        Ok(())
    }

    /// Serve until the task ends on its own
    pub async fn wait(self) -> Result<()> {
        self.task.await.context("Server task failed")??;
        Ok(())
    }
}

//! Server lifecycle: bind, spawn the axum server, shut it down on request.

use std::net::SocketAddr;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use underwriter_shared::{Result, UnderwriterError};

use crate::router::{AppState, router};

/// Handle to a running API server.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the server actually bound to (useful with port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal graceful shutdown and wait for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("API server shutdown signal sent");
        }
        if let Err(e) = self.task.await {
            error!("API server task failed: {e}");
        }
    }
}

/// Bind `addr` and serve the API router in a background task.
pub async fn start(addr: SocketAddr, state: AppState) -> Result<ServerHandle> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| UnderwriterError::Network(format!("failed to bind {addr}: {e}")))?;
    let addr = listener
        .local_addr()
        .map_err(|e| UnderwriterError::Network(format!("failed to read bound address: {e}")))?;

    let app = router(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            info!("API server received shutdown signal");
        };

        info!(%addr, "API server started");
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            error!("API server error: {e}");
        }
        info!("API server stopped");
    });

    Ok(ServerHandle {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

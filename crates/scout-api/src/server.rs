//! HTTP server lifecycle.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;

use scout_core::Result;

use crate::routes::{router, AppState};

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

impl ServerConfig {
    /// Create a config for `addr`.
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Replace the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }
}

/// Serve the API until Ctrl+C.
pub async fn serve(config: ServerConfig, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(config.addr).await?;
    tracing::info!("Scout API listening on http://{}", listener.local_addr()?);

    serve_with_shutdown(listener, state, async {
        // kill -2 <PID> to gracefully shutdown the server.
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Graceful shutdown initiated");
    })
    .await
}

/// Serve the API on an already bound listener until `shutdown` resolves.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

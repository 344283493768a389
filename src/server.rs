use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::{self, AppState};
use crate::config::NetdashConfig;
use crate::error::Result;

/// The dashboard server: binds the configured address and serves the
/// tool endpoints plus the streaming channel until ctrl-c.
pub struct DashboardServer {
    config: Arc<NetdashConfig>,
    state: AppState,
}

impl DashboardServer {
    pub fn new(config: Arc<NetdashConfig>) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    pub async fn run(self) -> Result<()> {
        let app = api::router(self.state);

        let listener = TcpListener::bind(&self.config.listen_addr).await?;
        info!("Dashboard server listening on {}", self.config.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Dashboard server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => warn!("Failed to listen for shutdown signal: {e}"),
    }
}

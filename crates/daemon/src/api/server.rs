/// Announce server implementation

use super::handlers::{self, AppState};
use anyhow::Result;
use axum::{routing::post, Router};
use damnet_core::AnnounceResponder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// HTTP server accepting announce handshakes from remote nodes
pub struct ApiServer {
    listen_addr: SocketAddr,
    responder: Arc<AnnounceResponder>,
}

impl ApiServer {
    /// Create a new announce server
    pub fn new(listen_addr: SocketAddr, responder: Arc<AnnounceResponder>) -> Self {
        Self {
            listen_addr,
            responder,
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let state = AppState {
            responder: self.responder.clone(),
        };

        let app = Router::new()
            .route("/announce", post(handlers::announce))
            .layer(CorsLayer::permissive())
            .with_state(state);

        info!("announce server starting on {}", self.listen_addr);

        let listener = tokio::net::TcpListener::bind(self.listen_addr).await?;

        axum::serve(listener, app)
            .await
            .map_err(|e| anyhow::anyhow!("announce server error: {}", e))?;

        Ok(())
    }
}

//! REST server startup

use anyhow::{anyhow, Context, Result};
use axum::serve;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::server::routing::create_router;
use crate::server::state::AppContext;

const COMPONENT: &str = "concierge-server";

/// Serve the API on `addr` until the listener fails
pub async fn start_server(addr: SocketAddr, app: Arc<AppContext>) -> Result<()> {
  let logs = app.logs.clone();
  logs.info(&format!("Starting concierge REST server on {addr}"), COMPONENT).await;

  let router = create_router(app)
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()));

  let listener =
    TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {addr}"))?;
  logs.success(&format!("Server listening on {addr}"), COMPONENT).await;

  match serve(listener, router).await {
    Ok(_) => {
      logs.info("Server shutdown gracefully", COMPONENT).await;
      Ok(())
    }
    Err(e) => {
      logs.error(&format!("Server error: {e}"), COMPONENT).await;
      Err(anyhow!("Server error: {}", e))
    }
  }
}

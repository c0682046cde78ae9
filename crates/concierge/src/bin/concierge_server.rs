//! Concierge REST Server
//!
//! Loads the bookings dataset, vector index, insights and models once, then
//! serves the question and analytics endpoints.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use concierge::config::{Config, CONFIG_ENV_VAR};
use concierge::server::startup::start_server;
use concierge::server::state::AppContext;

#[derive(Parser)]
#[command(name = "concierge_server")]
#[command(about = "Concierge REST API Server")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), ", courtesy of Kernelle Software"))]
struct Args {
  /// Server bind address (overrides the config file)
  #[arg(long)]
  bind: Option<SocketAddr>,

  /// Bookings CSV (overrides the config file)
  #[arg(long)]
  dataset: Option<PathBuf>,

  /// Configuration file
  #[arg(short, long, env = CONFIG_ENV_VAR)]
  config: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // RUST_LOG wins when set; otherwise quiet the ONNX runtime
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if args.verbose {
      EnvFilter::new("info,ort=warn")
    } else {
      EnvFilter::new("concierge=info,concierge_server=info,ort=error,warn")
    }
  });

  tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

  let mut config = Config::load(args.config.as_deref())?;
  if let Some(bind) = args.bind {
    config.server.bind = bind;
  }
  if let Some(dataset) = args.dataset {
    config.data.dataset = dataset;
  }

  tracing::info!("Starting Concierge REST Server v{}", env!("CARGO_PKG_VERSION"));
  let bind = config.server.bind;

  let app = match AppContext::load(config) {
    Ok(app) => Arc::new(app),
    Err(e) => {
      tracing::error!("startup failed: {e:#}");
      return Err(e);
    }
  };

  start_server(bind, app).await
}

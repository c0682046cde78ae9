use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use concierge::cli::client::SERVER_URL_ENV_VAR;
use concierge::cli::commands;
use concierge::config::CONFIG_ENV_VAR;

#[derive(Parser)]
#[command(name = "concierge")]
#[command(
  about = "Concierge - Hotel Bookings Insights\nRevenue analytics and question answering over a bookings dataset"
)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), ", courtesy of Kernelle Software"))]
struct Cli {
  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

/// Options shared by the offline jobs
#[derive(Args)]
struct JobOptions {
  /// Configuration file
  #[arg(short, long, env = CONFIG_ENV_VAR)]
  config: Option<PathBuf>,

  /// Bookings CSV (overrides the config file)
  #[arg(long)]
  dataset: Option<PathBuf>,
}

/// Options shared by the server client commands
#[derive(Args)]
struct ServerOptions {
  /// Concierge server URL
  #[arg(long, env = SERVER_URL_ENV_VAR)]
  server: Option<String>,
}

#[derive(Subcommand)]
enum Command {
  /// Encode every booking and write the vector index
  Index {
    #[command(flatten)]
    job: JobOptions,
  },
  /// Precompute monthly revenue insights and the revenue chart
  Analyze {
    #[command(flatten)]
    job: JobOptions,
  },
  /// Ask the server a question about the bookings
  Ask {
    #[command(flatten)]
    server: ServerOptions,
    /// Question text (words are joined with spaces)
    #[arg(required = true)]
    question: Vec<String>,
  },
  /// Show the precomputed monthly revenue
  Analytics {
    #[command(flatten)]
    server: ServerOptions,
  },
  /// Download the revenue chart rendered by the server
  Plot {
    #[command(flatten)]
    server: ServerOptions,
    /// Where to write the PNG
    #[arg(short, long, default_value = "revenue_trends.png")]
    output: PathBuf,
  },
  /// Show server health and loaded data sizes
  Status {
    #[command(flatten)]
    server: ServerOptions,
  },
  /// Query server logs for debugging and monitoring
  Logs {
    #[command(flatten)]
    server: ServerOptions,
    /// Maximum number of log entries to return
    #[arg(short, long, default_value = "50")]
    limit: usize,
    /// Filter by log level (info, success, warn, error, all)
    #[arg(long, default_value = "all")]
    level: String,
  },
}

async fn handle(command: Command) -> Result<()> {
  match command {
    Command::Index { job } => {
      let config = commands::resolve_config(job.config.as_deref(), job.dataset)?;
      tokio::task::spawn_blocking(move || commands::index(&config)).await?
    }
    Command::Analyze { job } => {
      let config = commands::resolve_config(job.config.as_deref(), job.dataset)?;
      commands::analyze(&config)
    }
    Command::Ask { server, question } => {
      commands::ask(server.server.as_deref(), &question.join(" ")).await
    }
    Command::Analytics { server } => commands::analytics(server.server.as_deref()).await,
    Command::Plot { server, output } => commands::plot(server.server.as_deref(), &output).await,
    Command::Status { server } => commands::status(server.server.as_deref()).await,
    Command::Logs { server, limit, level } => {
      commands::logs(server.server.as_deref(), limit, &level).await
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if cli.verbose {
      EnvFilter::new("info,ort=warn")
    } else {
      EnvFilter::new("concierge=warn,ort=error,warn")
    }
  });
  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(filter)
    .init();

  handle(cli.command).await
}

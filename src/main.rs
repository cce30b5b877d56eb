mod api;
mod app;
mod commands;
mod config;
mod event;
mod models;
mod query;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "marquee")]
#[command(about = "A terminal client for a demo catalog server, built on a stale-while-revalidate query cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/marquee/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Catalog server base URL (overrides config)
  #[arg(short, long)]
  server: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // The terminal belongs to the TUI, so logs go to a file
  let _log_guard = init_tracing()?;

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(server) = args.server {
    config.server.url = server;
  }

  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}

fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = dirs::data_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("marquee")
    .join("logs");
  std::fs::create_dir_all(&log_dir)?;

  let appender = tracing_appender::rolling::daily(log_dir, "marquee.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("marquee=debug")),
    )
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

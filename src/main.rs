use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shopnexus::app::App;
use shopnexus::config::Config;
use shopnexus::credentials::{LocalStorage, TOKEN_KEY};

#[derive(Parser, Debug)]
#[command(name = "shopnexus")]
#[command(about = "A terminal storefront and admin console for ShopNexus")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./shopnexus.yaml, then $XDG_CONFIG_HOME/shopnexus/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Access token to store before starting (also read from SHOPNEXUS_TOKEN)
  #[arg(short, long)]
  token: Option<String>,

  /// Location to open, e.g. /cart or /admin/tags
  #[arg(short, long)]
  path: Option<String>,
}

/// Log to a daily file in the data directory; the terminal belongs to the UI.
fn init_logging() -> Result<WorkerGuard> {
  let dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("shopnexus")
    .join("logs");
  std::fs::create_dir_all(&dir).map_err(|e| eyre!("Failed to create log directory: {}", e))?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
    dir,
    "shopnexus.log",
  ));

  let env_filter =
    EnvFilter::try_from_env("SHOPNEXUS_LOG").unwrap_or_else(|_| EnvFilter::new("shopnexus=info"));

  tracing_subscriber::registry()
    .with(env_filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_logging()?;

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;
  if let Some(path) = args.path {
    config.start_path = path;
  }

  let storage = Arc::new(LocalStorage::open()?);
  if let Some(token) = args.token.or_else(Config::token_from_env) {
    storage.set(TOKEN_KEY, &token)?;
  }

  info!(api = %config.api.url, start = %config.start_path, "starting");

  // Initialize and run the app
  let mut app = App::new(config, storage)?;
  app.run().await?;

  Ok(())
}

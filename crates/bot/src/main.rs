mod dispatch;
mod line;
mod logging;
mod plugins;
mod webhook;

use core::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context as _, Result};
use clap::Parser;
use coin_store::Store;
use plugin_core::{Messenger, PluginSpec};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    dispatch::Dispatcher,
    line::LineClient,
    logging::init_tracing,
    webhook::{AppState, create_router},
};

#[derive(Parser, Debug)]
#[command(
    name = "line-coin-bot",
    version,
    about = "LINE chat bot with a coin economy, keyword replies and tiered admin commands"
)]
struct Args {
    /// Port for the webhook server.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Channel access token used for replies and profile lookups.
    #[arg(long, env = "LINE_CHANNEL_ACCESS_TOKEN", hide_env_values = true)]
    channel_access_token: String,

    /// Messaging API base URL.
    #[arg(long, env = "LINE_API_BASE", default_value = "https://api.line.me")]
    api_base: String,

    /// Seconds before a Messaging API request is abandoned.
    #[arg(long, env = "LINE_HTTP_TIMEOUT_SECS", default_value_t = 10)]
    http_timeout_secs: u64,

    /// Directory holding users.json, keywords.json and blacklist.json.
    #[arg(long, env = "BOT_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Path to the YAML config (admins, plugin specs).
    #[arg(long, env = "BOT_CONFIG", default_value = "./config.yaml")]
    config: PathBuf,

    /// Root of per-plugin config files, `<dir>/<plugin id>/config.yaml`.
    #[arg(long, env = "PLUGINS_DIR", default_value = "./plugins")]
    plugins_dir: PathBuf,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub(crate) struct BotConfig {
    /// User ids that hold the administrator role from startup.
    #[serde(default)]
    pub(crate) admins: Vec<String>,
    #[serde(default)]
    pub(crate) plugins: Vec<PluginSpec>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so both clap and the log filter see it.
    let _ = dotenvy::dotenv();
    init_tracing();
    let args = Args::parse();

    let config = load_config(&args.config)?;
    let mut store = Store::open(&args.data_dir)
        .with_context(|| format!("opening data directory {}", args.data_dir.display()))?;
    for admin in &config.admins {
        store
            .seed_admin(admin)
            .with_context(|| format!("seeding administrator {admin}"))?;
    }
    info!(
        users = store.users().count(),
        keywords = store.keywords().len(),
        admins = config.admins.len(),
        "Store loaded"
    );

    let registry = plugins::build_registry(&config, &args.plugins_dir).await;
    for line in plugins::summary(&registry).await {
        info!(plugin = %line, "Registered plugin");
    }

    let messenger: Arc<dyn Messenger> = Arc::new(LineClient::new(
        &args.api_base,
        args.channel_access_token,
        Duration::from_secs(args.http_timeout_secs),
    )?);
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(Dispatcher::new(registry, messenger).run(store, rx));

    let app = create_router(AppState { tx });
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening for webhooks. Press Ctrl+C to stop.");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server failed")?;

    // The router owned the last sender; the worker finishes the queue and exits.
    worker.await.context("dispatcher task panicked")?;
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        core::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Reads the bot config. A missing file means an empty config.
fn load_config(path: &Path) -> Result<BotConfig> {
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(BotConfig::default());
    }
    let yaml = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {}", path.display()))?;
    let cfg: BotConfig = serde_yaml::from_str(&yaml).context("parsing YAML config")?;
    Ok(cfg)
}

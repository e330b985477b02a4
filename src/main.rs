//! Seinfeld CLI entry point.

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use seinfeld::config::{Config, RuntimeConfig};
use seinfeld::imaging::{ImagePipeline, ImageStore};
use seinfeld::llm::GeminiClient;
use seinfeld::messaging::DiscordAdapter;
use seinfeld::{Relay, prompts};

use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "seinfeld")]
#[command(about = "A Jerry Seinfeld persona bot for Discord, backed by Gemini")]
struct Cli {
    /// Path to config file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Prefix of the bot-specific environment variables
    #[arg(long, default_value = "seinfeld")]
    env_prefix: String,

    /// Also write daily-rotated logs into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let _log_guard = init_tracing(cli.debug, cli.log_dir.as_deref())?;

    tracing::info!("starting seinfeld");

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path, &cli.env_prefix)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load(&cli.env_prefix)
            .with_context(|| "failed to load configuration from environment")?,
    };

    tracing::info!(
        bot = %config.bot_name,
        chat_model = %config.models.chat_model_id,
        image_model = %config.models.image_model_id,
        channels = config.channels.all().len(),
        "configuration loaded"
    );

    let store = ImageStore::new(&config.images_dir);
    store
        .ensure_dir()
        .await
        .with_context(|| format!("failed to create {}", config.images_dir.display()))?;

    if !tokio::fs::try_exists(&config.fallback_image)
        .await
        .unwrap_or(false)
    {
        anyhow::bail!(
            "fallback image not found at {}",
            config.fallback_image.display()
        );
    }

    let persona = prompts::load_persona(config.persona_file.as_deref())
        .with_context(|| "failed to load persona")?;

    let gemini = Arc::new(
        GeminiClient::new(config.google_key.clone(), config.api_base_url.clone())
            .with_context(|| "failed to initialize Gemini client")?,
    );

    let runtime = Arc::new(RuntimeConfig::new(config.models.clone()));
    let images = ImagePipeline::new(gemini.clone(), store, config.fallback_image.clone());
    let relay = Relay::new(
        runtime,
        gemini,
        images,
        persona,
        config.channels.clone(),
        config.turn,
    );

    DiscordAdapter::new(Arc::new(relay))
        .run(&config.discord_token)
        .await
        .with_context(|| "discord client failed")?;

    tracing::info!("seinfeld stopped");
    Ok(())
}

/// Console logging, plus a daily-rotated file when `log_dir` is given.
///
/// `RUST_LOG` overrides the default level. The returned guard flushes the file
/// writer and must be held for the process lifetime.
fn init_tracing(
    debug: bool,
    log_dir: Option<&Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));

    let console_layer = tracing_subscriber::fmt::layer().compact();

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .init();
        return Ok(None);
    };

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "seinfeld.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(Some(guard))
}

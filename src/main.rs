use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use mealplan_bot::bot::{self, Bot};
use mealplan_bot::channels::{ChannelManager, CliChannel, TelegramChannel};
use mealplan_bot::config::{BotConfig, GeminiConfig, TelegramConfig};
use mealplan_bot::generation::GeminiGenerator;
use mealplan_bot::routes::{StatusRouteState, status_routes};
use mealplan_bot::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    let config = BotConfig::from_env()?;

    // Initialize tracing: stderr always, daily rolling file when configured.
    let (file_layer, _log_guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mealbot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    let gemini = GeminiConfig::from_env()?;

    eprintln!("🥗 Meal plan bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", gemini.model);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Currency: {}", config.currency);

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );

    let generator = Arc::new(GeminiGenerator::new(gemini));
    let bot = Arc::new(Bot::new(db.clone(), generator, &config));

    // ── Channels ─────────────────────────────────────────────────────────
    let mut channels = ChannelManager::new();
    let mut active_channels = Vec::new();

    if config.cli_enabled {
        channels.add(Box::new(CliChannel::new().with_user_id(config.cli_user_id)));
        active_channels.push("cli");
    }

    if let Some(telegram) = TelegramConfig::from_env() {
        if telegram.payment_token.is_none() {
            tracing::warn!("TELEGRAM_PAYMENT_TOKEN not set; subscriptions cannot be purchased");
        }
        channels.add(Box::new(TelegramChannel::from_config(&telegram)));
        active_channels.push("telegram");
    }

    if active_channels.is_empty() {
        anyhow::bail!("no channels enabled: set TELEGRAM_BOT_TOKEN or MEALBOT_CLI=1");
    }
    eprintln!("   Channels: {}", active_channels.join(", "));
    for (name, health) in channels.health_check_all().await {
        if let Err(e) = health {
            tracing::warn!(channel = %name, "Health check failed: {e}");
        }
    }

    // ── Status API ───────────────────────────────────────────────────────
    if let Some(port) = config.http_port {
        let app = status_routes(StatusRouteState { store: db.clone() });
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("failed to bind status port {port}"))?;
        eprintln!("   Status API: http://0.0.0.0:{port}/api/health");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Status server stopped: {e}");
            }
        });
    }
    eprintln!();

    bot::run(bot, Arc::new(channels), &config).await?;
    Ok(())
}

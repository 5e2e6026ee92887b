use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use turnout_bot::bot::SurveyBot;
use turnout_bot::channels::{CliChannel, TelegramChannel, Transport};
use turnout_bot::config::BotConfig;
use turnout_bot::survey::{Catalog, SurveyController};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotConfig::from_env()?;

    // Initialize tracing: stderr always, plus a daily file when a log dir is set
    let (file_layer, _log_guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "turnout-bot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    let catalog = Catalog::default();
    eprintln!("🚚 Turnout bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Roster: {} couriers, {} reasons, {} normalization factors",
        catalog.couriers.len(),
        catalog.reasons.len(),
        catalog.norms.len()
    );

    let transport: Arc<dyn Transport> = match &config.bot_token {
        Some(token) => {
            eprintln!(
                "   Telegram: enabled (allowed: {})",
                config.allowed_users_display()
            );
            Arc::new(TelegramChannel::new(
                token.clone(),
                config.allowed_users.clone(),
                config.poll_timeout_secs,
            ))
        }
        None => {
            eprintln!("   Telegram: disabled (TELEGRAM_BOT_TOKEN not set), using CLI");
            eprintln!("   Type /start, then button payloads such as q1_no or driver:1. /done aborts.\n");
            Arc::new(CliChannel::new())
        }
    };

    match config.session_idle_timeout {
        Some(idle) => eprintln!("   Idle sessions expire after {}s", idle.as_secs()),
        None => eprintln!("   Idle session expiry: disabled"),
    }
    if let Some(dir) = &config.log_dir {
        eprintln!("   Log dir: {}", dir.display());
    }

    let controller = SurveyController::new(catalog);
    let bot = SurveyBot::new(controller, transport, config.session_idle_timeout);
    bot.run().await?;

    Ok(())
}

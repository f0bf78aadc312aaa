use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use arbx_rs::bot::console::run_console;
use arbx_rs::bot::context::BotContext;
use arbx_rs::bot::telegram::{run_polling, TelegramClient};
use arbx_rs::bot::{Notifier, StdoutNotifier};
use arbx_rs::{settings, telemetry};

#[derive(Debug, Parser)]
#[command(name = "arbx", about = "Simulated cross-exchange arbitrage bot", version)]
struct Cli {
    /// TOML configuration file (defaults to ./arbx.toml when present)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Read commands from stdin instead of Telegram
    #[arg(long)]
    console: bool,

    /// Default tracing filter, overridden by RUST_LOG
    #[arg(long, default_value = "info,arbx_rs=debug")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env
    let cli = Cli::parse();

    telemetry::init_tracing(&cli.log_level);
    telemetry::init_metrics()?;

    let settings = settings::load(cli.config.as_deref())
        .inspect_err(|e| error!(error = %e, "Invalid configuration"))?;
    info!(
        pair = %settings.pair,
        interval_s = settings.loop_interval.as_secs(),
        trade_size = %settings.trade_size_usdt,
        min_profit_pct = %settings.min_profit_pct,
        "Configuration loaded"
    );

    if cli.console {
        let notifier: Arc<dyn Notifier> = Arc::new(StdoutNotifier);
        let ctx = BotContext::from_settings(&settings, notifier).context("building HTTP client")?;
        run_console(Arc::new(ctx)).await?;
        return Ok(());
    }

    let telegram = settings
        .require_telegram()
        .inspect_err(|e| error!(error = %e, "Invalid configuration"))?;
    let tg = Arc::new(TelegramClient::new(telegram).context("building Telegram client")?);
    let notifier: Arc<dyn Notifier> = tg.clone();
    let ctx = BotContext::from_settings(&settings, notifier).context("building HTTP client")?;
    let ctx = Arc::new(ctx);

    tokio::select! {
        _ = run_polling(ctx.clone(), tg) => {}
        res = tokio::signal::ctrl_c() => {
            res.context("listening for ctrl-c")?;
            info!("Shutdown requested");
        }
    }

    ctx.shutdown().await;
    Ok(())
}

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dipbot::api::BinanceClient;
use dipbot::config::{BotConfig, Credentials};
use dipbot::execution::{RunOutcome, Shutdown, Trader, TraderSettings};
use dipbot::strategy::DipEntryStrategy;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

/// Single-symbol dip-entry trading bot
#[derive(Parser, Debug)]
#[command(name = "dipbot", version)]
struct Cli {
    /// Config file (defaults to ./dipbot.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Symbol to trade, e.g. BTCUSDT
    #[arg(long)]
    symbol: Option<String>,

    /// Order quantity in base asset units
    #[arg(long)]
    quantity: Option<Decimal>,

    /// Trade on the production exchange instead of testnet
    #[arg(long)]
    live: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    tracing::info!("🚀 dipbot starting");
    tracing::info!("📊 Configuration:");
    tracing::info!("  Symbol: {}", config.symbol);
    tracing::info!("  Quantity: {}", config.quantity);
    tracing::info!("  Window: {} x {}", config.lookback, config.interval);
    tracing::info!(
        "  Entry > {} | Exit > {} or < {}",
        config.thresholds.entry,
        config.thresholds.exit_gain,
        config.thresholds.exit_loss
    );

    let credentials = Credentials::from_env(config.testnet)?;
    let client = BinanceClient::new(config.gateway_config(credentials))
        .context("Failed to create exchange client")?;

    if config.testnet {
        tracing::info!("Connected to the testnet server ({})", client.base_url());
    } else {
        tracing::info!("Connected to the main server ({})", client.base_url());
    }

    let shutdown = Shutdown::new();
    shutdown.listen_for_ctrl_c();

    let strategy = DipEntryStrategy::new(config.thresholds, config.quantity);
    let mut trader = Trader::new(client, strategy, TraderSettings::from(&config), shutdown);

    match trader.run().await.context("Trading loop failed")? {
        RunOutcome::Completed(trade) => {
            tracing::info!(
                "✅ Round trip complete: {} {} bought @ {} sold @ {} (P&L {}, {:.3}%)",
                trade.quantity,
                trade.symbol,
                trade.entry_price,
                trade.exit_price,
                trade.pnl,
                trade.return_pct()
            );
        }
        RunOutcome::Interrupted {
            liquidation: Some(trade),
        } => {
            tracing::warn!(
                "Interrupted; liquidated {} {} @ {} (P&L {})",
                trade.quantity,
                trade.symbol,
                trade.exit_price,
                trade.pnl
            );
        }
        RunOutcome::Interrupted { liquidation: None } => {
            tracing::warn!("Interrupted with no open position");
        }
    }

    tracing::info!("👋 dipbot stopped");
    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dipbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> anyhow::Result<BotConfig> {
    let mut config = BotConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(symbol) = &cli.symbol {
        config.symbol = symbol.to_uppercase();
    }
    if let Some(quantity) = cli.quantity {
        config.quantity = quantity;
    }
    if cli.live {
        config.testnet = false;
    }

    config.validate()?;
    Ok(config)
}

use anyhow::Context;
use dipbot::api::{BinanceClient, Gateway};
use dipbot::config::{BotConfig, Credentials};

/// Print balances for the configured environment
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter("dipbot=info")
        .init();

    let config = BotConfig::load(None).context("Failed to load configuration")?;
    let credentials = Credentials::from_env(config.testnet)?;
    let client = BinanceClient::new(config.gateway_config(credentials))?;

    let account = client
        .fetch_account_snapshot()
        .await
        .context("Failed to fetch account")?;

    println!(
        "=== Account ({}) ===",
        if config.testnet { "testnet" } else { "mainnet" }
    );
    println!("Can trade: {}", account.can_trade);
    println!("Updated:   {}", account.update_time.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("{:<10} {:>20} {:>20}", "Asset", "Free", "Locked");
    for balance in account.non_zero_balances() {
        println!(
            "{:<10} {:>20} {:>20}",
            balance.asset, balance.free, balance.locked
        );
    }

    Ok(())
}

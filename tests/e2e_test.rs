use std::time::Duration;

use dipbot::api::BinanceClient;
use dipbot::config::{Credentials, GatewayConfig, TESTNET_BASE_URL};
use dipbot::strategy::{DipEntryStrategy, Thresholds};
use dipbot::*;
use rust_decimal::Decimal;

fn testnet_client(credentials: Credentials) -> BinanceClient {
    BinanceClient::new(GatewayConfig {
        base_url: TESTNET_BASE_URL.to_string(),
        credentials,
        rate_limit_per_minute: 1200,
        request_timeout: Duration::from_secs(10),
    })
    .unwrap()
}

#[tokio::test]
#[ignore] // Requires network access to the Binance testnet
async fn test_e2e_market_data() {
    let _ = tracing_subscriber::fmt::try_init();

    println!("=== Starting E2E Test ===\n");

    // Klines are public; any key will do
    let client = testnet_client(Credentials::new("public", "public"));

    println!("1. Fetching klines...");
    let series = client.fetch_candles("BTCUSDT", "1m", 30).await.unwrap();
    assert!(series.len() >= 2, "expected a usable window, got {}", series.len());
    println!("   ✓ {} candles, last open {}", series.len(), series.last().unwrap().open);

    for pair in series.observations().windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
        assert!(pair[1].open > Decimal::ZERO);
    }

    println!("\n2. Evaluating strategy...");
    let strategy = DipEntryStrategy::new(Thresholds::default(), Decimal::new(1, 3));
    let decision = strategy.evaluate(&series, &Position::Flat);
    println!("   ✓ Decision while flat: {:?}", decision);
    assert!(matches!(
        decision,
        TradeDecision::Hold | TradeDecision::EnterLong { .. }
    ));

    println!("\n=== E2E Test Complete ===");
}

#[tokio::test]
#[ignore] // Requires TESTNET_API_KEY / TESTNET_API_SECRET
async fn test_e2e_account_snapshot() {
    dotenvy::dotenv().ok();
    let credentials = Credentials::from_env(true).expect("testnet credentials not set");

    let account = testnet_client(credentials)
        .fetch_account_snapshot()
        .await
        .unwrap();

    println!("Can trade: {}", account.can_trade);
    for balance in account.non_zero_balances() {
        println!("  {} free={} locked={}", balance.asset, balance.free, balance.locked);
    }
    assert!(!account.balances.is_empty());
}

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{AccountInfo, OrderConfirmation, OrderSide, PriceSeries};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("exchange rejected request ({code}): {msg}")]
    Exchange { code: i64, msg: String },

    #[error("rate limited by exchange (HTTP {0})")]
    RateLimited(u16),

    #[error("failed to deserialize response: {0}")]
    Deserialization(String),

    #[error("invalid data from exchange: {0}")]
    InvalidData(String),
}

/// Market data and order entry for a single exchange
///
/// Every call is attempted once; failures are returned to the caller.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// The most recent `limit` candles, oldest first
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<PriceSeries, GatewayError>;

    /// Submit a market order and wait for its fill
    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        client_order_id: &str,
    ) -> Result<OrderConfirmation, GatewayError>;

    /// Current balances
    async fn fetch_account_snapshot(&self) -> Result<AccountInfo, GatewayError>;
}

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::OrderSide;

// Binance Spot REST payloads. Decimals arrive as JSON strings.

/// `POST /api/v3/order` with `newOrderRespType=FULL`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    pub order_id: i64,
    pub client_order_id: String,
    pub transact_time: i64,
    pub executed_qty: Decimal,
    pub cummulative_quote_qty: Decimal,
    pub status: String,
    pub side: OrderSide,
    #[serde(default)]
    pub fills: Vec<Fill>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub price: Decimal,
    pub qty: Decimal,
}

impl OrderResponse {
    /// Quantity-weighted fill price, falling back to quote/base totals
    pub fn average_price(&self) -> Option<Decimal> {
        let filled: Decimal = self.fills.iter().map(|f| f.qty).sum();
        if !filled.is_zero() {
            let notional: Decimal = self.fills.iter().map(|f| f.price * f.qty).sum();
            return Some(notional / filled);
        }

        if self.executed_qty.is_zero() {
            return None;
        }
        Some(self.cummulative_quote_qty / self.executed_qty)
    }
}

/// `GET /api/v3/account`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub can_trade: bool,
    pub update_time: i64,
    pub balances: Vec<BalanceResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub code: i64,
    pub msg: String,
}

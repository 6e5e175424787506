use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use super::auth::sign_request;
use super::gateway::{Gateway, GatewayError};
use super::responses::{AccountResponse, ApiErrorResponse, OrderResponse};
use crate::config::{Credentials, GatewayConfig};
use crate::models::{
    AccountInfo, Balance, OrderConfirmation, OrderSide, PriceObservation, PriceSeries,
};

const RECV_WINDOW_MS: u64 = 5000;

// Type alias for the rate limiter to simplify signatures
type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Binance Spot REST client
///
/// Cloneable; all clones share the rate limiter. Requests are never retried.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    rate_limiter: Arc<BinanceRateLimiter>,
}

impl BinanceClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let api_key = HeaderValue::from_str(&config.credentials.api_key).map_err(|e| {
            GatewayError::InvalidData(format!("API key is not a valid header value: {}", e))
        })?;
        let mut headers = HeaderMap::new();
        headers.insert("X-MBX-APIKEY", api_key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        let per_minute = NonZeroU32::new(config.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        tracing::info!(base_url = %config.base_url, "Binance client ready");

        Ok(Self {
            client,
            base_url: config.base_url,
            credentials: config.credentials,
            rate_limiter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sign `params` (plus timestamp and recvWindow) and send them as the query string
    async fn send_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        mut params: Vec<(&str, String)>,
    ) -> Result<T, GatewayError> {
        params.push(("recvWindow", RECV_WINDOW_MS.to_string()));
        params.push(("timestamp", Utc::now().timestamp_millis().to_string()));

        let query = encode_query(&params);
        let signature = sign_request(self.credentials.api_secret(), &query);
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

        self.rate_limiter.until_ready().await;
        let response = self.client.request(method, &url).send().await?;
        parse_response(response).await
    }
}

/// Parameters here are plain symbols, numbers and hex ids; no escaping needed
fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        return serde_json::from_str::<T>(&text)
            .map_err(|e| GatewayError::Deserialization(format!("{}: {}", e, text)));
    }

    // 429 is a warning, 418 an IP ban after ignoring 429s
    if matches!(status.as_u16(), 418 | 429) {
        return Err(GatewayError::RateLimited(status.as_u16()));
    }

    match serde_json::from_str::<ApiErrorResponse>(&text) {
        Ok(body) => Err(GatewayError::Exchange {
            code: body.code,
            msg: body.msg,
        }),
        Err(_) => Err(GatewayError::Exchange {
            code: i64::from(status.as_u16()),
            msg: text,
        }),
    }
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, GatewayError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| GatewayError::InvalidData(format!("invalid timestamp: {}", ms)))
}

fn decimal_field(row: &[serde_json::Value], index: usize) -> Result<Decimal, GatewayError> {
    let raw = row
        .get(index)
        .and_then(|v| v.as_str())
        .ok_or_else(|| GatewayError::InvalidData(format!("kline field {} missing", index)))?;
    Decimal::from_str(raw)
        .map_err(|e| GatewayError::InvalidData(format!("kline field {} = {:?}: {}", index, raw, e)))
}

/// Kline rows are positional arrays; only open time and OHLCV are used
fn parse_kline(row: &[serde_json::Value]) -> Result<PriceObservation, GatewayError> {
    let open_time = row
        .first()
        .and_then(|v| v.as_i64())
        .ok_or_else(|| GatewayError::InvalidData("kline open time missing".to_string()))?;

    Ok(PriceObservation {
        timestamp: millis_to_datetime(open_time)?,
        open: decimal_field(row, 1)?,
        high: decimal_field(row, 2)?,
        low: decimal_field(row, 3)?,
        close: decimal_field(row, 4)?,
        volume: decimal_field(row, 5)?,
    })
}

fn to_confirmation(order: OrderResponse) -> Result<OrderConfirmation, GatewayError> {
    if order.status != "FILLED" {
        tracing::warn!(
            order_id = order.order_id,
            status = %order.status,
            executed = %order.executed_qty,
            "Market order not fully filled"
        );
    }

    let filled_price = order.average_price().ok_or_else(|| {
        GatewayError::InvalidData(format!("order {} reported no fills", order.order_id))
    })?;

    Ok(OrderConfirmation {
        timestamp: millis_to_datetime(order.transact_time)?,
        filled_quantity: order.executed_qty,
        filled_price,
        asset: order.symbol,
        side: order.side,
        order_id: order.order_id,
        client_order_id: order.client_order_id,
    })
}

#[async_trait]
impl Gateway for BinanceClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<PriceSeries, GatewayError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let symbol = symbol.to_uppercase();
        let limit = limit.to_string();

        tracing::debug!(symbol = %symbol, interval, limit = %limit, "Fetching klines");

        self.rate_limiter.until_ready().await;
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol.as_str()),
                ("interval", interval),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let rows: Vec<Vec<serde_json::Value>> = parse_response(response).await?;
        let observations = rows
            .iter()
            .map(|row| parse_kline(row))
            .collect::<Result<Vec<_>, _>>()?;

        PriceSeries::new(observations).map_err(|e| GatewayError::InvalidData(e.to_string()))
    }

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        client_order_id: &str,
    ) -> Result<OrderConfirmation, GatewayError> {
        let params = vec![
            ("symbol", symbol.to_uppercase()),
            ("side", side.as_str().to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", quantity.normalize().to_string()),
            ("newClientOrderId", client_order_id.to_string()),
            ("newOrderRespType", "FULL".to_string()),
        ];

        tracing::info!(symbol, side = %side, quantity = %quantity, "Submitting market order");

        let order: OrderResponse = self
            .send_signed(Method::POST, "/api/v3/order", params)
            .await?;
        to_confirmation(order)
    }

    async fn fetch_account_snapshot(&self) -> Result<AccountInfo, GatewayError> {
        let account: AccountResponse = self
            .send_signed(Method::GET, "/api/v3/account", Vec::new())
            .await?;

        Ok(AccountInfo {
            can_trade: account.can_trade,
            update_time: millis_to_datetime(account.update_time)?,
            balances: account
                .balances
                .into_iter()
                .map(|b| Balance {
                    asset: b.asset,
                    free: b.free,
                    locked: b.locked,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    const KLINES: &str = r#"[
        [1700000000000, "100.00", "100.50", "99.50", "100.10", "12.5", 1700000059999, "1250.0", 42, "6.0", "600.0", "0"],
        [1700000060000, "99.95", "100.20", "99.90", "100.00", "8.0", 1700000119999, "800.0", 30, "4.0", "400.0", "0"],
        [1700000120000, "99.99", "100.10", "99.80", "99.85", "9.0", 1700000179999, "900.0", 35, "4.5", "450.0", "0"]
    ]"#;

    const ORDER: &str = r#"{
        "symbol": "BTCUSDT",
        "orderId": 7,
        "orderListId": -1,
        "clientOrderId": "abc123",
        "transactTime": 1700000180000,
        "price": "0.00000000",
        "origQty": "0.10000000",
        "executedQty": "0.10000000",
        "cummulativeQuoteQty": "3000.00000000",
        "status": "FILLED",
        "timeInForce": "GTC",
        "type": "MARKET",
        "side": "BUY",
        "fills": [{"price": "30000.00", "qty": "0.10000000", "commission": "0", "commissionAsset": "BTC", "tradeId": 1}]
    }"#;

    fn client_for(server: &Server) -> BinanceClient {
        BinanceClient::new(GatewayConfig {
            base_url: server.url(),
            credentials: Credentials::new("test-key", "test-secret"),
            rate_limit_per_minute: 1200,
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_candles_parses_klines() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
                Matcher::UrlEncoded("interval".into(), "1m".into()),
                Matcher::UrlEncoded("limit".into(), "3".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(KLINES)
            .create_async()
            .await;

        let series = client_for(&server)
            .fetch_candles("btcusdt", "1m", 3)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(series.len(), 3);
        assert_eq!(series.opens(), vec![dec!(100.00), dec!(99.95), dec!(99.99)]);
        let last = series.last().unwrap();
        assert_eq!(last.close, dec!(99.85));
        assert_eq!(last.volume, dec!(9.0));
        assert_eq!(last.timestamp.timestamp_millis(), 1_700_000_120_000);
    }

    #[tokio::test]
    async fn test_fetch_candles_rejects_unordered_rows() {
        let mut server = Server::new_async().await;
        let body = r#"[
            [1700000060000, "1", "1", "1", "1", "1"],
            [1700000000000, "1", "1", "1", "1", "1"]
        ]"#;
        server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::Any)
            .with_body(body)
            .create_async()
            .await;

        let result = client_for(&server).fetch_candles("BTCUSDT", "1m", 2).await;
        assert!(matches!(result, Err(GatewayError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_fetch_candles_rejects_bad_decimal() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::Any)
            .with_body(r#"[[1700000000000, "abc", "1", "1", "1", "1"]]"#)
            .create_async()
            .await;

        let result = client_for(&server).fetch_candles("BTCUSDT", "1m", 1).await;
        assert!(matches!(result, Err(GatewayError::InvalidData(msg)) if msg.contains("abc")));
    }

    #[tokio::test]
    async fn test_submit_market_order_is_signed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v3/order")
            .match_header("x-mbx-apikey", "test-key")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
                Matcher::UrlEncoded("side".into(), "BUY".into()),
                Matcher::UrlEncoded("type".into(), "MARKET".into()),
                Matcher::UrlEncoded("quantity".into(), "0.1".into()),
                Matcher::UrlEncoded("newClientOrderId".into(), "abc123".into()),
                Matcher::Regex("timestamp=[0-9]+".into()),
                Matcher::Regex("signature=[0-9a-f]{64}$".into()),
            ]))
            .with_status(200)
            .with_body(ORDER)
            .create_async()
            .await;

        let confirmation = client_for(&server)
            .submit_market_order("BTCUSDT", OrderSide::Buy, dec!(0.10000000), "abc123")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(confirmation.side, OrderSide::Buy);
        assert_eq!(confirmation.filled_price, dec!(30000));
        assert_eq!(confirmation.filled_quantity, dec!(0.1));
        assert_eq!(confirmation.asset, "BTCUSDT");
        assert_eq!(confirmation.timestamp.timestamp_millis(), 1_700_000_180_000);
    }

    #[tokio::test]
    async fn test_exchange_error_is_mapped() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v3/order")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"code":-2010,"msg":"Account has insufficient balance for requested action."}"#)
            .create_async()
            .await;

        let result = client_for(&server)
            .submit_market_order("BTCUSDT", OrderSide::Sell, dec!(1), "x")
            .await;

        match result {
            Err(GatewayError::Exchange { code, msg }) => {
                assert_eq!(code, -2010);
                assert!(msg.contains("insufficient balance"));
            }
            other => panic!("expected exchange error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_status_is_mapped() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"code":-1003,"msg":"Too many requests"}"#)
            .create_async()
            .await;

        let result = client_for(&server).fetch_candles("BTCUSDT", "1m", 30).await;
        assert!(matches!(result, Err(GatewayError::RateLimited(429))));
    }

    #[tokio::test]
    async fn test_fetch_account_snapshot() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/account")
            .match_header("x-mbx-apikey", "test-key")
            .match_query(Matcher::Regex("signature=".into()))
            .with_body(
                r#"{
                    "makerCommission": 15,
                    "canTrade": true,
                    "updateTime": 1700000000000,
                    "balances": [
                        {"asset": "BTC", "free": "1.00000000", "locked": "0.50000000"},
                        {"asset": "USDT", "free": "0.00000000", "locked": "0.00000000"}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let account = client_for(&server).fetch_account_snapshot().await.unwrap();

        mock.assert_async().await;
        assert!(account.can_trade);
        assert_eq!(account.balance("BTC").unwrap().total(), dec!(1.5));
        assert_eq!(account.non_zero_balances().count(), 1);
    }

    #[tokio::test]
    async fn test_ip_ban_status_is_mapped() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::Any)
            .with_status(418)
            .with_body(r#"{"code":-1003,"msg":"Way too many requests; IP banned"}"#)
            .create_async()
            .await;

        let result = client_for(&server).fetch_candles("BTCUSDT", "1m", 30).await;
        assert!(matches!(result, Err(GatewayError::RateLimited(418))));
    }

    #[tokio::test]
    async fn test_non_json_error_body_uses_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("<html>bad gateway</html>")
            .create_async()
            .await;

        let result = client_for(&server).fetch_candles("BTCUSDT", "1m", 30).await;
        match result {
            Err(GatewayError::Exchange { code, msg }) => {
                assert_eq!(code, 502);
                assert_eq!(msg, "<html>bad gateway</html>");
            }
            other => panic!("expected exchange error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v3/account")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let result = client_for(&server).fetch_account_snapshot().await;
        assert!(matches!(result, Err(GatewayError::Deserialization(msg)) if msg.contains("{not json")));
    }

    #[test]
    fn test_encode_query() {
        let params = vec![("symbol", "BTCUSDT".to_string()), ("limit", "30".to_string())];
        assert_eq!(encode_query(&params), "symbol=BTCUSDT&limit=30");
    }
}

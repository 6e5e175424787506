use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One OHLCV candle as returned by the exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceObservation {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SeriesError {
    #[error("duplicate timestamp {0} in price series")]
    DuplicateTimestamp(DateTime<Utc>),

    #[error("price series out of order: {next} follows {previous}")]
    OutOfOrder {
        previous: DateTime<Utc>,
        next: DateTime<Utc>,
    },
}

/// Time-ordered candles with strictly increasing timestamps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    observations: Vec<PriceObservation>,
}

impl PriceSeries {
    /// Build a series, rejecting duplicate or out-of-order timestamps
    pub fn new(observations: Vec<PriceObservation>) -> Result<Self, SeriesError> {
        for pair in observations.windows(2) {
            let (previous, next) = (pair[0].timestamp, pair[1].timestamp);
            if next == previous {
                return Err(SeriesError::DuplicateTimestamp(next));
            }
            if next < previous {
                return Err(SeriesError::OutOfOrder { previous, next });
            }
        }

        Ok(Self { observations })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    pub fn last(&self) -> Option<&PriceObservation> {
        self.observations.last()
    }

    pub fn opens(&self) -> Vec<Decimal> {
        self.observations.iter().map(|o| o.open).collect()
    }

    pub fn closes(&self) -> Vec<Decimal> {
        self.observations.iter().map(|o| o.close).collect()
    }

    /// Sub-series of observations strictly after `timestamp`
    pub fn after(&self, timestamp: DateTime<Utc>) -> PriceSeries {
        // Ordered, so everything past the partition point qualifies
        let start = self
            .observations
            .partition_point(|o| o.timestamp <= timestamp);
        PriceSeries {
            observations: self.observations[start..].to_vec(),
        }
    }

    /// The last `n` observations (the whole series if shorter)
    pub fn tail(&self, n: usize) -> PriceSeries {
        let start = self.observations.len().saturating_sub(n);
        PriceSeries {
            observations: self.observations[start..].to_vec(),
        }
    }
}

/// Position state for the single traded symbol
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Position {
    #[default]
    Flat,
    Entered {
        entry_time: DateTime<Utc>,
        entry_price: Decimal,
        quantity: Decimal,
    },
}

impl Position {
    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn is_entered(&self) -> bool {
        matches!(self, Position::Entered { .. })
    }

    /// Quantity held, zero when flat
    pub fn quantity(&self) -> Decimal {
        match self {
            Position::Flat => Decimal::ZERO,
            Position::Entered { quantity, .. } => *quantity,
        }
    }
}

/// Output of one evaluation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDecision {
    Hold,
    EnterLong { quantity: Decimal },
    ExitLong { quantity: Decimal },
}

impl TradeDecision {
    /// Order side needed to act on this decision, `None` for Hold
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            TradeDecision::Hold => None,
            TradeDecision::EnterLong { .. } => Some(OrderSide::Buy),
            TradeDecision::ExitLong { .. } => Some(OrderSide::Sell),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fill report for a submitted market order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderConfirmation {
    pub timestamp: DateTime<Utc>,
    pub filled_quantity: Decimal,
    pub filled_price: Decimal,
    pub asset: String,
    pub side: OrderSide,
    pub order_id: i64,
    pub client_order_id: String,
}

/// Balance of a single asset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Balance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

impl Balance {
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

/// Account balances, used for observability only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountInfo {
    pub can_trade: bool,
    pub update_time: DateTime<Utc>,
    pub balances: Vec<Balance>,
}

impl AccountInfo {
    pub fn balance(&self, asset: &str) -> Option<&Balance> {
        self.balances.iter().find(|b| b.asset == asset)
    }

    /// Balances with a non-zero total
    pub fn non_zero_balances(&self) -> impl Iterator<Item = &Balance> {
        self.balances.iter().filter(|b| !b.total().is_zero())
    }
}

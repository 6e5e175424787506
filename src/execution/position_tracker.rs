use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{OrderConfirmation, OrderSide, Position};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransitionError {
    #[error("already holding a position in {0}, cannot enter again")]
    AlreadyEntered(String),

    #[error("no open position in {0} to exit")]
    NotEntered(String),

    #[error("expected a {expected} confirmation, got {actual}")]
    WrongSide {
        expected: OrderSide,
        actual: OrderSide,
    },
}

/// Completed entry/exit round trip
#[derive(Debug, Clone, PartialEq)]
pub struct RealizedTrade {
    pub symbol: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: Decimal,
    pub pnl: Decimal,
}

impl RealizedTrade {
    /// Return on the entry notional as a percentage
    pub fn return_pct(&self) -> Decimal {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        (self.exit_price - self.entry_price) / self.entry_price * Decimal::ONE_HUNDRED
    }
}

/// Owns the position for one symbol and applies confirmed fills to it
///
/// The only place a `Position` changes state. Entering twice or exiting while
/// flat is rejected, so confirmed entries and exits always alternate.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    symbol: String,
    position: Position,
    completed_trades: u32,
    total_pnl: Decimal,
}

impl PositionTracker {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            position: Position::Flat,
            completed_trades: 0,
            total_pnl: Decimal::ZERO,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn completed_trades(&self) -> u32 {
        self.completed_trades
    }

    /// Get total realized P&L
    pub fn total_pnl(&self) -> Decimal {
        self.total_pnl
    }

    /// Flat -> Entered, using the fill time and price
    pub fn confirm_entry(&mut self, confirmation: &OrderConfirmation) -> Result<(), TransitionError> {
        if self.position.is_entered() {
            return Err(TransitionError::AlreadyEntered(self.symbol.clone()));
        }
        if confirmation.side != OrderSide::Buy {
            return Err(TransitionError::WrongSide {
                expected: OrderSide::Buy,
                actual: confirmation.side,
            });
        }

        self.position = Position::Entered {
            entry_time: confirmation.timestamp,
            entry_price: confirmation.filled_price,
            quantity: confirmation.filled_quantity,
        };

        tracing::info!(
            symbol = %self.symbol,
            price = %confirmation.filled_price,
            quantity = %confirmation.filled_quantity,
            "Position entered"
        );

        Ok(())
    }

    /// Entered -> Flat, reporting the realized trade
    pub fn confirm_exit(
        &mut self,
        confirmation: &OrderConfirmation,
    ) -> Result<RealizedTrade, TransitionError> {
        let Position::Entered {
            entry_time,
            entry_price,
            ..
        } = self.position
        else {
            return Err(TransitionError::NotEntered(self.symbol.clone()));
        };
        if confirmation.side != OrderSide::Sell {
            return Err(TransitionError::WrongSide {
                expected: OrderSide::Sell,
                actual: confirmation.side,
            });
        }

        let quantity = confirmation.filled_quantity;
        let pnl = (confirmation.filled_price - entry_price) * quantity;

        let trade = RealizedTrade {
            symbol: self.symbol.clone(),
            entry_time,
            exit_time: confirmation.timestamp,
            entry_price,
            exit_price: confirmation.filled_price,
            quantity,
            pnl,
        };

        self.position = Position::Flat;
        self.completed_trades += 1;
        self.total_pnl += pnl;

        tracing::info!(
            symbol = %self.symbol,
            entry = %trade.entry_price,
            exit = %trade.exit_price,
            pnl = %trade.pnl,
            "Position closed ({:.3}%)",
            trade.return_pct()
        );

        Ok(trade)
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Strategy;
use crate::indicators::cumulative_return;
use crate::models::{Position, PriceSeries, TradeDecision};

/// Signed fractional return thresholds
///
/// `entry` is negative (e.g. -0.002), `exit_gain` positive (0.0015) and
/// `exit_loss` negative (-0.0015).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub entry: Decimal,
    pub exit_gain: Decimal,
    pub exit_loss: Decimal,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            entry: Decimal::new(-2, 3),     // -0.2%
            exit_gain: Decimal::new(15, 4), // +0.15%
            exit_loss: Decimal::new(-15, 4), // -0.15%
        }
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum ThresholdError {
    #[error("entry threshold must be negative, got {0}")]
    EntryNotNegative(Decimal),

    #[error("exit gain threshold must be positive, got {0}")]
    ExitGainNotPositive(Decimal),

    #[error("exit loss threshold must be negative, got {0}")]
    ExitLossNotNegative(Decimal),
}

impl Thresholds {
    /// Check the sign conventions
    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.entry >= Decimal::ZERO {
            return Err(ThresholdError::EntryNotNegative(self.entry));
        }
        if self.exit_gain <= Decimal::ZERO {
            return Err(ThresholdError::ExitGainNotPositive(self.exit_gain));
        }
        if self.exit_loss >= Decimal::ZERO {
            return Err(ThresholdError::ExitLossNotNegative(self.exit_loss));
        }
        Ok(())
    }
}

/// Map a price window and the current position to one decision
///
/// Pure: the position is never mutated here. Flat positions enter when the
/// compounded return of the opens is above `entry`; this fires on a small or
/// no decline rather than a deep one. Entered positions only look at candles
/// strictly after the entry time and exit once that return leaves the
/// `(exit_loss, exit_gain)` band.
pub fn evaluate(
    series: &PriceSeries,
    position: &Position,
    thresholds: &Thresholds,
    quantity: Decimal,
) -> TradeDecision {
    if series.len() < 2 {
        return TradeDecision::Hold;
    }

    match position {
        Position::Flat => {
            let Some(window_return) = cumulative_return(&series.opens()) else {
                return TradeDecision::Hold;
            };

            tracing::debug!(
                window_return = %window_return,
                threshold = %thresholds.entry,
                "Evaluated entry"
            );

            if window_return > thresholds.entry {
                TradeDecision::EnterLong { quantity }
            } else {
                TradeDecision::Hold
            }
        }
        Position::Entered {
            entry_time,
            quantity: held,
            ..
        } => {
            let since_entry = series.after(*entry_time);
            // Fewer than two candles since entry: no defined return yet
            let Some(since_entry_return) = cumulative_return(&since_entry.opens()) else {
                return TradeDecision::Hold;
            };

            tracing::debug!(
                since_entry_return = %since_entry_return,
                candles = since_entry.len(),
                "Evaluated exit"
            );

            if since_entry_return > thresholds.exit_gain
                || since_entry_return < thresholds.exit_loss
            {
                TradeDecision::ExitLong { quantity: *held }
            } else {
                TradeDecision::Hold
            }
        }
    }
}

/// Enter on a shallow pullback, exit on a fixed take-profit/stop band
#[derive(Debug, Clone)]
pub struct DipEntryStrategy {
    thresholds: Thresholds,
    quantity: Decimal,
}

impl DipEntryStrategy {
    pub fn new(thresholds: Thresholds, quantity: Decimal) -> Self {
        Self {
            thresholds,
            quantity,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }
}

impl Strategy for DipEntryStrategy {
    fn evaluate(&self, series: &PriceSeries, position: &Position) -> TradeDecision {
        evaluate(series, position, &self.thresholds, self.quantity)
    }

    fn name(&self) -> &str {
        "DipEntryStrategy"
    }
}

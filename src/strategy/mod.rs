// Trading strategy module
pub mod dip_entry;

use crate::models::{Position, PriceSeries, TradeDecision};

pub use dip_entry::{evaluate, DipEntryStrategy, ThresholdError, Thresholds};

/// Decision procedure over a price window and the current position
pub trait Strategy: Send + Sync {
    /// Produce exactly one decision; must not depend on hidden mutable state
    fn evaluate(&self, series: &PriceSeries, position: &Position) -> TradeDecision;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Fewest observations that can produce anything other than Hold
    fn min_observations(&self) -> usize {
        2
    }
}

// Price indicators
// Compounded returns drive decisions; RSI is logged for context only

pub mod returns;
pub mod rsi;

pub use returns::{cumulative_return, pct_change};
pub use rsi::calculate_rsi;

// Order execution and position lifecycle
pub mod executor;
pub mod position_tracker;
pub mod shutdown;
pub mod trader;

pub use executor::{ExecutionAction, ExecutionDecision, Executor, OrderRequest};
pub use position_tracker::{PositionTracker, RealizedTrade, TransitionError};
pub use shutdown::Shutdown;
pub use trader::{RunOutcome, Trader, TraderError, TraderSettings};

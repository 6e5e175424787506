use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{OrderSide, Position, TradeDecision};

/// Market order ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub client_order_id: String,
}

impl OrderRequest {
    pub fn market(symbol: &str, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            quantity,
            client_order_id: Uuid::new_v4().simple().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionAction {
    Submit(OrderRequest),
    Skip,
}

#[derive(Debug, Clone)]
pub struct ExecutionDecision {
    pub action: ExecutionAction,
    pub reason: String,
}

/// Turns strategy decisions into orders for one symbol
pub struct Executor {
    symbol: String,
}

impl Executor {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }

    /// Decide what to submit for a decision given the current position
    pub fn process_decision(
        &self,
        decision: &TradeDecision,
        position: &Position,
    ) -> ExecutionDecision {
        match decision {
            TradeDecision::EnterLong { quantity } => {
                if position.is_entered() {
                    return ExecutionDecision {
                        action: ExecutionAction::Skip,
                        reason: "Already have open position".to_string(),
                    };
                }
                if *quantity <= Decimal::ZERO {
                    return ExecutionDecision {
                        action: ExecutionAction::Skip,
                        reason: format!("Refusing to buy non-positive quantity {}", quantity),
                    };
                }

                ExecutionDecision {
                    action: ExecutionAction::Submit(OrderRequest::market(
                        &self.symbol,
                        OrderSide::Buy,
                        *quantity,
                    )),
                    reason: "Entry condition met".to_string(),
                }
            }

            TradeDecision::ExitLong { quantity } => {
                if position.is_flat() {
                    return ExecutionDecision {
                        action: ExecutionAction::Skip,
                        reason: "No position to sell".to_string(),
                    };
                }

                ExecutionDecision {
                    action: ExecutionAction::Submit(OrderRequest::market(
                        &self.symbol,
                        OrderSide::Sell,
                        *quantity,
                    )),
                    reason: "Exit band breached".to_string(),
                }
            }

            TradeDecision::Hold => ExecutionDecision {
                action: ExecutionAction::Skip,
                reason: "Hold signal".to_string(),
            },
        }
    }

    /// Sell order that liquidates whatever is held, `None` when flat
    pub fn liquidation(&self, position: &Position) -> Option<OrderRequest> {
        match position {
            Position::Flat => None,
            Position::Entered { quantity, .. } => Some(OrderRequest::market(
                &self.symbol,
                OrderSide::Sell,
                *quantity,
            )),
        }
    }
}

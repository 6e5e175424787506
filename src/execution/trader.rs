use std::time::Duration;

use thiserror::Error;

use super::executor::{ExecutionAction, Executor, OrderRequest};
use super::position_tracker::{PositionTracker, RealizedTrade, TransitionError};
use super::shutdown::Shutdown;
use crate::api::{Gateway, GatewayError};
use crate::config::BotConfig;
use crate::indicators::calculate_rsi;
use crate::models::{OrderConfirmation, OrderSide, Position, PriceSeries};
use crate::strategy::Strategy;

const RSI_PERIOD: usize = 14;

#[derive(Debug, Error)]
pub enum TraderError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// One full entry/exit round trip was confirmed
    Completed(RealizedTrade),
    /// Shutdown was signalled; carries the forced exit if a position was open
    Interrupted { liquidation: Option<RealizedTrade> },
}

#[derive(Debug, Clone)]
pub struct TraderSettings {
    pub symbol: String,
    pub interval: String,
    pub lookback: usize,
    pub poll_interval: Duration,
}

impl From<&BotConfig> for TraderSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            symbol: config.symbol.clone(),
            interval: config.interval.clone(),
            lookback: config.lookback,
            poll_interval: config.poll_interval(),
        }
    }
}

/// Polling control loop for a single symbol
///
/// Each cycle fetches the candle window, evaluates the strategy, submits an
/// order for any non-Hold decision and applies the confirmation. Gateway
/// errors end the run; nothing is retried. The one exception is the account
/// snapshot, which is logged for observability and whose failure is only
/// warned about.
pub struct Trader<G: Gateway, S: Strategy> {
    gateway: G,
    strategy: S,
    executor: Executor,
    tracker: PositionTracker,
    settings: TraderSettings,
    shutdown: Shutdown,
}

impl<G: Gateway, S: Strategy> Trader<G, S> {
    pub fn new(gateway: G, strategy: S, settings: TraderSettings, shutdown: Shutdown) -> Self {
        Self {
            executor: Executor::new(settings.symbol.clone()),
            tracker: PositionTracker::new(settings.symbol.clone()),
            gateway,
            strategy,
            settings,
            shutdown,
        }
    }

    pub fn position(&self) -> &Position {
        self.tracker.position()
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Poll until one round trip completes or shutdown is signalled
    pub async fn run(&mut self) -> Result<RunOutcome, TraderError> {
        tracing::info!(
            symbol = %self.settings.symbol,
            interval = %self.settings.interval,
            lookback = self.settings.lookback,
            strategy = self.strategy.name(),
            "Trading loop starting"
        );
        self.log_account_snapshot().await;

        loop {
            if self.shutdown.is_triggered() {
                return self.liquidate().await;
            }

            let series = self
                .gateway
                .fetch_candles(
                    &self.settings.symbol,
                    &self.settings.interval,
                    self.settings.lookback,
                )
                .await?;

            if self.shutdown.is_triggered() {
                return self.liquidate().await;
            }

            if let Some(trade) = self.step(&series).await? {
                return Ok(RunOutcome::Completed(trade));
            }

            if self.shutdown.sleep(self.settings.poll_interval).await {
                return self.liquidate().await;
            }
        }
    }

    /// One evaluate/submit/confirm pass over `series`
    ///
    /// Returns the realized trade when this step closed the position.
    pub async fn step(&mut self, series: &PriceSeries) -> Result<Option<RealizedTrade>, TraderError> {
        self.log_market(series);

        if series.len() < self.strategy.min_observations() {
            tracing::info!(
                "  Waiting for data ({}/{} candles)",
                series.len(),
                self.strategy.min_observations()
            );
            return Ok(None);
        }

        let decision = self.strategy.evaluate(series, self.tracker.position());
        let plan = self
            .executor
            .process_decision(&decision, self.tracker.position());

        tracing::info!("  Decision: {:?} - {}", decision, plan.reason);

        let order = match plan.action {
            ExecutionAction::Skip => return Ok(None),
            ExecutionAction::Submit(order) => order,
        };

        let confirmation = self.submit(&order).await?;
        let realized = match order.side {
            OrderSide::Buy => {
                self.tracker.confirm_entry(&confirmation)?;
                None
            }
            OrderSide::Sell => Some(self.tracker.confirm_exit(&confirmation)?),
        };

        self.log_account_snapshot().await;
        Ok(realized)
    }

    /// Forced exit on shutdown; does nothing when flat
    async fn liquidate(&mut self) -> Result<RunOutcome, TraderError> {
        let Some(order) = self.executor.liquidation(self.tracker.position()) else {
            tracing::warn!("Shutdown requested with no open position, nothing to liquidate");
            return Ok(RunOutcome::Interrupted { liquidation: None });
        };

        tracing::warn!(
            symbol = %order.symbol,
            quantity = %order.quantity,
            "Shutdown requested, liquidating open position"
        );

        let confirmation = self.submit(&order).await?;
        let trade = self.tracker.confirm_exit(&confirmation)?;
        Ok(RunOutcome::Interrupted {
            liquidation: Some(trade),
        })
    }

    async fn submit(&self, order: &OrderRequest) -> Result<OrderConfirmation, GatewayError> {
        let confirmation = self
            .gateway
            .submit_market_order(
                &order.symbol,
                order.side,
                order.quantity,
                &order.client_order_id,
            )
            .await?;

        tracing::info!(
            order_id = confirmation.order_id,
            client_order_id = %confirmation.client_order_id,
            side = %confirmation.side,
            price = %confirmation.filled_price,
            quantity = %confirmation.filled_quantity,
            "  ✓ Order filled"
        );

        Ok(confirmation)
    }

    fn log_market(&self, series: &PriceSeries) {
        let Some(latest) = series.last() else {
            tracing::info!(symbol = %self.settings.symbol, "No candles returned");
            return;
        };

        match calculate_rsi(&series.closes(), RSI_PERIOD) {
            Some(rsi) => tracing::info!(
                "  {} @ {} ({} candles, RSI {:.1})",
                self.settings.symbol,
                latest.close,
                series.len(),
                rsi
            ),
            None => tracing::info!(
                "  {} @ {} ({} candles)",
                self.settings.symbol,
                latest.close,
                series.len()
            ),
        }
    }

    /// Observability only; failures are logged and ignored
    async fn log_account_snapshot(&self) {
        match self.gateway.fetch_account_snapshot().await {
            Ok(account) => {
                tracing::info!("📊 Account (can trade: {}):", account.can_trade);
                for balance in account.non_zero_balances() {
                    tracing::info!(
                        "    {} | free {} | locked {}",
                        balance.asset,
                        balance.free,
                        balance.locked
                    );
                }
            }
            Err(e) => tracing::warn!("Failed to fetch account snapshot: {}", e),
        }
    }
}

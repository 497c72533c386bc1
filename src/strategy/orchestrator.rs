//! Decision orchestration - one evaluation per inbound request.
//!
//! The Orchestrator is the only component that talks to the others. Steps run
//! strictly in sequence:
//!
//! 1. Cancel the stale pending order (link id)
//! 2. Fetch candles and recent positions
//! 3. Position open: fetch quote, exit, stop
//! 4. Otherwise: evaluate the dip, and on a dip fetch quote and enter
//!
//! Any failure short-circuits the remaining steps.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::SessionConfig;
use crate::error::BotError;
use crate::exchange::{Exchange, OrderIntent};
use crate::risk::PositionTracker;

use super::{CancelOutcome, DipDetector, MarketDataFetcher, OrderExecutor};

/// Pipeline step, used to qualify failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    GetArgs,
    Cancel,
    GetOhlcv,
    GetPositions,
    GetTicker,
    Exit,
    Entry,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::GetArgs => "get args",
            Stage::Cancel => "cancel",
            Stage::GetOhlcv => "get ohlcv",
            Stage::GetPositions => "get positions",
            Stage::GetTicker => "get ticker",
            Stage::Exit => "exit",
            Stage::Entry => "entry",
        };
        f.write_str(label)
    }
}

/// A failed evaluation step.
#[derive(Debug, Error)]
#[error("failed to {stage}, {source}")]
pub struct StageError {
    pub stage: Stage,
    pub source: BotError,
}

impl StageError {
    pub fn new(stage: Stage, source: BotError) -> Self {
        Self { stage, source }
    }
}

/// What an evaluation did.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Dip detected and entry order placed (or logged in dry run).
    Entered(OrderIntent),
    /// A recent position was found; `None` when exits are disabled.
    Exited(Option<OrderIntent>),
    /// No position and no dip.
    NoDip,
}

/// Epoch milliseconds.
pub type Clock = fn() -> i64;

fn system_clock() -> i64 {
    Utc::now().timestamp_millis()
}

/// Drives one request-scoped evaluation against the exchange.
pub struct Orchestrator {
    session: SessionConfig,
    exchange: Arc<dyn Exchange>,
    clock: Clock,
}

impl Orchestrator {
    pub fn new(session: SessionConfig, exchange: Arc<dyn Exchange>) -> Self {
        Self {
            session,
            exchange,
            clock: system_clock,
        }
    }

    /// Replace the wall clock used for freshness windows.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    /// Run the full cancel → fetch → exit/entry sequence over a `target_n` candle window.
    #[instrument(skip(self), fields(symbol = %self.session.symbol, category = %self.session.category))]
    pub async fn evaluate(&self, target_n: usize) -> Result<Decision, StageError> {
        let exchange = self.exchange.as_ref();
        let executor = OrderExecutor::new(exchange, &self.session);
        let market = MarketDataFetcher::new(exchange, &self.session);
        let tracker = PositionTracker::new(exchange, &self.session);

        match executor
            .cancel_pending_order()
            .await
            .map_err(|e| StageError::new(Stage::Cancel, e))?
        {
            CancelOutcome::Unreachable(reason) => {
                warn!(%reason, "Could not confirm cancellation, continuing")
            }
            outcome => info!(?outcome, "Pending order handled"),
        }

        let candles = market
            .get_candles(target_n)
            .await
            .map_err(|e| StageError::new(Stage::GetOhlcv, e))?;

        let positions = tracker
            .get_open_positions_at((self.clock)())
            .await
            .map_err(|e| StageError::new(Stage::GetPositions, e))?;

        let (token_size, has_position) = tracker.aggregate_position_size(&positions);
        if has_position {
            let quote = market
                .get_quote_at((self.clock)())
                .await
                .map_err(|e| StageError::new(Stage::GetTicker, e))?;

            let order = executor
                .exit(token_size, quote.best_ask)
                .await
                .map_err(|e| StageError::new(Stage::Exit, e))?;

            info!(%token_size, ask = %quote.best_ask, "Exited position");
            return Ok(Decision::Exited(order));
        }

        let detector = DipDetector::new(self.session.dip_threshold);
        if !detector.is_dip(target_n, &candles) {
            return Ok(Decision::NoDip);
        }

        let quote = market
            .get_quote_at((self.clock)())
            .await
            .map_err(|e| StageError::new(Stage::GetTicker, e))?;

        let order = executor
            .entry(quote.best_bid)
            .await
            .map_err(|e| StageError::new(Stage::Entry, e))?;

        info!(qty = %order.qty, bid = %quote.best_bid, "Bought the dip");
        Ok(Decision::Entered(order))
    }
}

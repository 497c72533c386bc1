//! Order execution: entry, reduce-only exit and pending order cancellation.

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::config::SessionConfig;
use crate::error::{BotError, BotResult};
use crate::exchange::{
    ApiResponse, CancelRequest, Exchange, OrderIntent, Side, TimeInForce, RET_CODE_ORDER_NOT_EXISTS,
};
use crate::utils::decimal::truncate_to_precision;

/// Result of cancelling the order tagged with the session link id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// A pending order was cancelled.
    Cancelled,
    /// The exchange reported no such order.
    NothingToCancel,
    /// The cancel request never got an answer; whether an order is still
    /// pending is unknown.
    Unreachable(String),
}

/// Places and cancels orders for the session instrument.
pub struct OrderExecutor<'a> {
    exchange: &'a dyn Exchange,
    session: &'a SessionConfig,
}

impl<'a> OrderExecutor<'a> {
    pub fn new(exchange: &'a dyn Exchange, session: &'a SessionConfig) -> Self {
        Self { exchange, session }
    }

    /// Cancel the order carrying the session's stable link id.
    #[instrument(skip(self), fields(symbol = %self.session.symbol, link_id = %self.session.order_link_id))]
    pub async fn cancel_pending_order(&self) -> BotResult<CancelOutcome> {
        let request = CancelRequest {
            category: self.session.category,
            symbol: self.session.symbol.clone(),
            order_link_id: self.session.order_link_id.clone(),
        };

        let response = match self.exchange.cancel_order(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Cancel request failed");
                return Ok(CancelOutcome::Unreachable(format!("{:#}", e)));
            }
        };

        match response.ret_code {
            code if code == RET_CODE_ORDER_NOT_EXISTS => {
                info!("No pending order to cancel");
                Ok(CancelOutcome::NothingToCancel)
            }
            _ if response.is_ok() => {
                info!("Cancelled pending order");
                Ok(CancelOutcome::Cancelled)
            }
            code => Err(BotError::Cancel(format!(
                "cancel rejected with retCode {}: {}",
                code, response.ret_msg
            ))),
        }
    }

    /// Buy `order_size / best_bid` tokens.
    ///
    /// Limit orders are post-only at `best_bid`.
    #[instrument(skip(self), fields(symbol = %self.session.symbol))]
    pub async fn entry(&self, best_bid: Decimal) -> BotResult<OrderIntent> {
        if self.session.order_size <= Decimal::ZERO {
            return Err(BotError::InvalidSize(format!(
                "order size must be positive, got {}",
                self.session.order_size
            )));
        }

        let mut qty = self.session.order_size.checked_div(best_bid).ok_or_else(|| {
            BotError::InvalidSize(format!("cannot size an order at price {}", best_bid))
        })?;
        if let Some(decimals) = self.session.qty_precision {
            qty = truncate_to_precision(qty, decimals);
        }
        if qty <= Decimal::ZERO {
            return Err(BotError::InvalidSize(format!(
                "order quantity rounds to {} at price {}",
                qty, best_bid
            )));
        }

        let order = OrderIntent {
            category: self.session.category,
            symbol: self.session.symbol.clone(),
            side: Side::Buy,
            order_type: self.session.order_kind,
            qty,
            price: Some(best_bid),
            time_in_force: (!self.session.is_market()).then_some(TimeInForce::PostOnly),
            order_link_id: Some(self.session.order_link_id.clone()),
            reduce_only: None,
        };

        self.submit(order, "entry").await
    }

    /// Sell `token_size` reduce-only at `best_ask`.
    ///
    /// Returns `Ok(None)` without touching the exchange when exits are disabled.
    /// A non-positive quantity is refused: a zero-qty reduce-only order closes
    /// the whole position on this exchange.
    #[instrument(skip(self), fields(symbol = %self.session.symbol))]
    pub async fn exit(&self, token_size: Decimal, best_ask: Decimal) -> BotResult<Option<OrderIntent>> {
        if !self.session.exit_enabled {
            info!("Exit disabled, holding position");
            return Ok(None);
        }
        if token_size <= Decimal::ZERO {
            return Err(BotError::NoPosition("position is not found".to_string()));
        }

        // Post-only only for market sessions; entries use the opposite condition.
        let order = OrderIntent {
            category: self.session.category,
            symbol: self.session.symbol.clone(),
            side: Side::Sell,
            order_type: self.session.order_kind,
            qty: token_size,
            price: Some(best_ask),
            time_in_force: self.session.is_market().then_some(TimeInForce::PostOnly),
            order_link_id: None,
            reduce_only: Some(true),
        };

        self.submit(order, "exit").await.map(Some)
    }

    async fn submit(&self, order: OrderIntent, label: &str) -> BotResult<OrderIntent> {
        if self.session.dry_run {
            info!(?order, "[dry run] {} order not submitted", label);
            return Ok(order);
        }

        let response: ApiResponse = self
            .exchange
            .place_order(&order)
            .await
            .map_err(|e| BotError::Execution(format!("{} order failed: {:#}", label, e)))?;

        if !response.is_ok() {
            return Err(BotError::Execution(format!(
                "{} order rejected with retCode {}: {}",
                label, response.ret_code, response.ret_msg
            )));
        }

        info!(
            side = ?order.side,
            qty = %order.qty,
            price = ?order.price,
            result = %response.result,
            "{} order placed",
            label
        );
        Ok(order)
    }
}

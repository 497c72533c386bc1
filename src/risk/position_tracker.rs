//! Recent position lookup and size aggregation.
//!
//! Only positions opened within the last candle interval (plus slack) are
//! relevant to the current decision; older entries are left alone.

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::SessionConfig;
use crate::error::{BotError, BotResult};
use crate::exchange::{Exchange, Position};

/// One candle interval plus one second of slack.
pub const POSITION_WINDOW_MS: i64 = 61_000;

/// Reads open positions for the session instrument.
pub struct PositionTracker<'a> {
    exchange: &'a dyn Exchange,
    session: &'a SessionConfig,
}

impl<'a> PositionTracker<'a> {
    pub fn new(exchange: &'a dyn Exchange, session: &'a SessionConfig) -> Self {
        Self { exchange, session }
    }

    /// Positions created within [`POSITION_WINDOW_MS`] of `now_ms`.
    #[instrument(skip(self), fields(symbol = %self.session.symbol))]
    pub async fn get_open_positions_at(&self, now_ms: i64) -> BotResult<Vec<Position>> {
        let response = self
            .exchange
            .get_positions(self.session.category, &self.session.symbol)
            .await
            .map_err(|e| BotError::Fetch(format!("position request failed: {:#}", e)))?;

        if !response.is_ok() {
            return Err(BotError::Fetch(format!(
                "position list returned retCode {}: {}",
                response.ret_code, response.ret_msg
            )));
        }

        let list = response
            .result_list()
            .ok_or_else(|| BotError::Fetch("position result has no list".to_string()))?;

        let cutoff = now_ms - POSITION_WINDOW_MS;
        let mut positions = Vec::with_capacity(list.len());
        for raw in list {
            let fields = match raw {
                Value::Object(fields) => fields.clone(),
                _ => return Err(BotError::Fetch("position entry is not an object".to_string())),
            };
            let position = Position::new(fields);

            match position.created_time() {
                Some(created) if created >= cutoff => positions.push(position),
                Some(created) => {
                    debug!(created, cutoff, "Skipping position outside the window")
                }
                None => debug!("Skipping position with unparseable createdTime"),
            }
        }

        debug!(total = list.len(), recent = positions.len(), "Fetched positions");
        Ok(positions)
    }

    /// Sum of `size` over `positions` and whether any position was given.
    ///
    /// Entries whose size is not numeric are skipped. `has_position` reflects
    /// the list, not the sum: a non-empty list that sums to zero still reports
    /// a position, and the exit guard refuses the zero quantity.
    pub fn aggregate_position_size(&self, positions: &[Position]) -> (Decimal, bool) {
        let aggregate = positions
            .iter()
            .filter_map(Position::size)
            .fold(Decimal::ZERO, |sum, size| sum + size);

        debug!(symbol = %self.session.symbol, %aggregate, count = positions.len(), "Aggregate position size");
        (aggregate, !positions.is_empty())
    }
}

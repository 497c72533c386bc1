//! Candle and quote retrieval with shape and freshness checks.

use crate::config::SessionConfig;
use crate::error::{BotError, BotResult};
use crate::exchange::{ApiResponse, Candle, Exchange, Quote};
use crate::utils::decimal::parse_decimal;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, instrument};

/// One-minute candles.
pub const CANDLE_INTERVAL: &str = "1";

/// start, open, high, low, close, volume, turnover
pub const CANDLE_FIELDS: usize = 7;

/// Maximum age of a ticker snapshot that may be acted upon.
pub const QUOTE_FRESHNESS_MS: i64 = 10_000;

/// Reads market state for the session instrument.
pub struct MarketDataFetcher<'a> {
    exchange: &'a dyn Exchange,
    session: &'a SessionConfig,
}

impl<'a> MarketDataFetcher<'a> {
    pub fn new(exchange: &'a dyn Exchange, session: &'a SessionConfig) -> Self {
        Self { exchange, session }
    }

    /// Fetch exactly `n` one-minute candles, newest first.
    #[instrument(skip(self), fields(symbol = %self.session.symbol))]
    pub async fn get_candles(&self, n: usize) -> BotResult<Vec<Candle>> {
        let response = self
            .exchange
            .get_kline(self.session.category, &self.session.symbol, CANDLE_INTERVAL, n)
            .await
            .map_err(|e| BotError::Fetch(format!("kline request failed: {:#}", e)))?;
        ensure_ok(&response, "kline")?;

        let list = response
            .result_list()
            .ok_or_else(|| BotError::DataShape("kline result has no candle list".to_string()))?;
        if list.len() < n {
            return Err(BotError::DataShape(format!(
                "expected {} candles, got {}",
                n,
                list.len()
            )));
        }

        let candles = list
            .iter()
            .take(n)
            .enumerate()
            .map(|(i, raw)| parse_candle(i, raw))
            .collect::<BotResult<Vec<_>>>()?;

        // Newest first: every start must be >= the one after it.
        if let Some(i) = candles.windows(2).position(|w| w[0].start < w[1].start) {
            return Err(BotError::Ordering(format!(
                "candles not in descending order at index {}: {} < {}",
                i,
                candles[i].start,
                candles[i + 1].start
            )));
        }

        debug!(count = candles.len(), newest = ?candles.first(), "Fetched candles");
        Ok(candles)
    }

    /// Fetch the current best bid/ask, rejecting snapshots older than
    /// [`QUOTE_FRESHNESS_MS`] relative to `now_ms`.
    #[instrument(skip(self), fields(symbol = %self.session.symbol))]
    pub async fn get_quote_at(&self, now_ms: i64) -> BotResult<Quote> {
        let response = self
            .exchange
            .get_tickers(self.session.category, &self.session.symbol)
            .await
            .map_err(|e| BotError::Fetch(format!("ticker request failed: {:#}", e)))?;
        ensure_ok(&response, "ticker")?;

        let age_ms = now_ms.saturating_sub(response.time);
        if age_ms > QUOTE_FRESHNESS_MS {
            return Err(BotError::StaleData(format!(
                "ticker is {}ms old, limit {}ms",
                age_ms, QUOTE_FRESHNESS_MS
            )));
        }

        let list = response
            .result_list()
            .ok_or_else(|| BotError::DataShape("ticker result has no list".to_string()))?;

        let entry = list
            .iter()
            .find(|t| t.get("symbol").and_then(Value::as_str) == Some(self.session.symbol.as_str()))
            .ok_or_else(|| {
                BotError::NotFound(format!("{} not found in ticker list", self.session.symbol))
            })?;

        let quote = Quote {
            symbol: self.session.symbol.clone(),
            last_price: price_field(entry, "lastPrice")?,
            index_price: optional_price_field(entry, "indexPrice"),
            mark_price: optional_price_field(entry, "markPrice"),
            best_bid: positive_price_field(entry, "bid1Price")?,
            best_ask: positive_price_field(entry, "ask1Price")?,
            timestamp: response.time,
        };

        debug!(bid = %quote.best_bid, ask = %quote.best_ask, age_ms, "Fetched ticker");
        Ok(quote)
    }
}

fn ensure_ok(response: &ApiResponse, what: &str) -> BotResult<()> {
    if response.is_ok() {
        Ok(())
    } else {
        Err(BotError::Fetch(format!(
            "{} returned retCode {}: {}",
            what, response.ret_code, response.ret_msg
        )))
    }
}

fn parse_candle(index: usize, raw: &Value) -> BotResult<Candle> {
    let fields = raw
        .as_array()
        .ok_or_else(|| BotError::DataShape(format!("candle {} is not an array", index)))?;
    if fields.len() < CANDLE_FIELDS {
        return Err(BotError::DataShape(format!(
            "candle {} has {} fields, expected {}",
            index,
            fields.len(),
            CANDLE_FIELDS
        )));
    }

    let text = |i: usize| -> BotResult<String> {
        fields[i]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BotError::DataShape(format!("candle {} field {} is not a string", index, i)))
    };

    let start = text(0)?
        .parse::<i64>()
        .map_err(|_| BotError::DataShape(format!("candle {} has an invalid start time", index)))?;

    Ok(Candle {
        start,
        open: text(1)?,
        high: text(2)?,
        low: text(3)?,
        close: text(4)?,
        volume: text(5)?,
        turnover: text(6)?,
    })
}

fn optional_price_field(entry: &Value, key: &str) -> Option<Decimal> {
    entry.get(key).and_then(Value::as_str).and_then(parse_decimal)
}

fn price_field(entry: &Value, key: &str) -> BotResult<Decimal> {
    optional_price_field(entry, key)
        .ok_or_else(|| BotError::DataShape(format!("ticker {} is missing or invalid", key)))
}

fn positive_price_field(entry: &Value, key: &str) -> BotResult<Decimal> {
    let price = price_field(entry, key)?;
    if price <= Decimal::ZERO {
        return Err(BotError::DataShape(format!("ticker {} is not positive: {}", key, price)));
    }
    Ok(price)
}

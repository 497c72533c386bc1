//! Fixtures shared by the unit tests.

use crate::config::tests::valid_settings;
use crate::config::SessionConfig;
use crate::exchange::ApiResponse;
use serde_json::{json, Value};

/// Fixed evaluation clock, epoch milliseconds.
pub const NOW: i64 = 1_700_000_100_000;

pub fn session() -> SessionConfig {
    SessionConfig::from_settings(&valid_settings()).unwrap()
}

pub fn envelope(ret_code: i64, result: Value, time: i64) -> ApiResponse {
    ApiResponse {
        ret_code,
        ret_msg: if ret_code == 0 { "OK".to_string() } else { "error".to_string() },
        result,
        time,
    }
}

pub fn ok(result: Value) -> ApiResponse {
    envelope(0, result, NOW)
}

/// Kline row with only the close price varying.
pub fn candle_row(start: i64, close: &str) -> Value {
    json!([start.to_string(), "1", "1", "1", close, "10", "1000"])
}

pub fn ticker_row(symbol: &str, bid: &str, ask: &str) -> Value {
    json!({
        "symbol": symbol,
        "lastPrice": bid,
        "indexPrice": bid,
        "markPrice": bid,
        "bid1Price": bid,
        "ask1Price": ask
    })
}

pub fn position_row(size: &str, created_time: i64) -> Value {
    json!({
        "symbol": "BTCUSDT",
        "side": "Buy",
        "size": size,
        "createdTime": created_time.to_string()
    })
}

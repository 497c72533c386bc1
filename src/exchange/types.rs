//! Type definitions for Bybit V5 requests and responses.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// `retCode` of a successful call.
pub const RET_CODE_OK: i64 = 0;

/// `retCode` returned when cancelling an order that does not exist.
pub const RET_CODE_ORDER_NOT_EXISTS: i64 = 110001;

/// Market category of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Spot,
    Linear,
    Inverse,
    Option,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Spot => "spot",
            Category::Linear => "linear",
            Category::Inverse => "inverse",
            Category::Option => "option",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spot" => Ok(Category::Spot),
            "linear" => Ok(Category::Linear),
            "inverse" => Ok(Category::Inverse),
            "option" => Ok(Category::Option),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Market,
    Limit,
}

/// Time in force. Orders without one use the exchange default (GTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    PostOnly,
}

/// Common V5 response envelope.
///
/// `result` is kept untyped; the components decide what shape they expect.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    #[serde(default)]
    pub result: Value,
    /// Server time in epoch milliseconds
    #[serde(default)]
    pub time: i64,
}

impl ApiResponse {
    pub fn is_ok(&self) -> bool {
        self.ret_code == RET_CODE_OK
    }

    /// `result.list`, if present and an array.
    pub fn result_list(&self) -> Option<&Vec<Value>> {
        self.result.get("list").and_then(Value::as_array)
    }
}

/// One-minute OHLCV candle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candle {
    /// Start of the interval, epoch milliseconds
    pub start: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub turnover: String,
}

/// Best bid/ask snapshot for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub last_price: Decimal,
    /// Absent for spot instruments
    pub index_price: Option<Decimal>,
    pub mark_price: Option<Decimal>,
    pub best_bid: Decimal,
    pub best_ask: Decimal,
    /// Exchange reported time, epoch milliseconds
    pub timestamp: i64,
}

/// Raw position entry as reported by the exchange.
///
/// Only `size` and `createdTime` carry meaning here; the rest is kept for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub fields: Map<String, Value>,
}

impl Position {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Position size. The exchange sends it as a decimal string; numbers are accepted too.
    pub fn size(&self) -> Option<Decimal> {
        match self.fields.get("size")? {
            Value::String(s) => Decimal::from_str(s).ok(),
            Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            _ => None,
        }
    }

    /// Creation time in epoch milliseconds.
    pub fn created_time(&self) -> Option<i64> {
        match self.fields.get("createdTime")? {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }
}

/// Order request sent to `/v5/order/create`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIntent {
    pub category: Category,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderKind,
    #[serde(with = "rust_decimal::serde::str")]
    pub qty: Decimal,
    #[serde(
        with = "rust_decimal::serde::str_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<TimeInForce>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_link_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce_only: Option<bool>,
}

/// Order request sent to `/v5/order/cancel`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub category: Category,
    pub symbol: String,
    pub order_link_id: String,
}

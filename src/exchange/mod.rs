//! Bybit V5 REST integration.
//!
//! Provides:
//! - Market data (klines, tickers)
//! - Account operations (positions, order create/cancel)
//! - The `Exchange` trait the evaluation components are written against

mod client;
mod traits;
mod types;

pub use client::BybitClient;
#[cfg(test)]
pub use traits::MockExchange;
pub use traits::Exchange;
pub use types::*;

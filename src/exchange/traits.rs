//! Exchange abstraction used by the evaluation components.
//!
//! Implementations only move envelopes over the wire. Interpreting `retCode`
//! and the shape of `result` is left to the callers, so a mock can feed them
//! arbitrary (and malformed) payloads.

use async_trait::async_trait;

use super::types::{ApiResponse, CancelRequest, Category, OrderIntent};

/// REST operations needed for one evaluation.
///
/// `Err` means the call did not produce a decodable envelope (network
/// failure, timeout, non-2xx HTTP status).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Most recent `limit` candles of the given interval, newest first.
    async fn get_kline(
        &self,
        category: Category,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> anyhow::Result<ApiResponse>;

    /// Open positions for an instrument.
    async fn get_positions(&self, category: Category, symbol: &str)
        -> anyhow::Result<ApiResponse>;

    /// Ticker snapshot for an instrument.
    async fn get_tickers(&self, category: Category, symbol: &str) -> anyhow::Result<ApiResponse>;

    async fn place_order(&self, order: &OrderIntent) -> anyhow::Result<ApiResponse>;

    async fn cancel_order(&self, request: &CancelRequest) -> anyhow::Result<ApiResponse>;
}

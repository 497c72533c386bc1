//! Trading strategy implementation.
//!
//! Contains the core logic for:
//! - Market data retrieval and validation
//! - Dip detection over a candle window
//! - Order execution (entry, exit, cancel)
//! - Request-scoped decision orchestration

mod dip;
mod executor;
mod market_data;
mod orchestrator;

pub use dip::DipDetector;
pub use executor::{CancelOutcome, OrderExecutor};
pub use market_data::{MarketDataFetcher, CANDLE_FIELDS, CANDLE_INTERVAL, QUOTE_FRESHNESS_MS};
pub use orchestrator::{Clock, Decision, Orchestrator, Stage, StageError};

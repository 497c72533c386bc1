//! # Buy the Dips
//!
//! A small HTTP service that evaluates one Bybit instrument per request:
//! cancel the previous pending order, look for a recent position to exit,
//! otherwise buy when the close-to-close change over the last N one-minute
//! candles falls below a negative threshold.
//!
//! ## Architecture
//!
//! - `config`: Per-request settings from the environment and validation
//! - `exchange`: Bybit V5 REST client and wire types
//! - `strategy`: Market data, dip detection, order building and the evaluation sequence
//! - `risk`: Recent-position tracking and per-instrument admission
//! - `server`: axum router exposing `/health` and `/buy-the-dips`
//! - `utils`: Shared decimal arithmetic

pub mod config;
pub mod error;
pub mod exchange;
pub mod risk;
pub mod server;
pub mod strategy;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use config::SessionConfig;
pub use error::{BotError, BotResult};

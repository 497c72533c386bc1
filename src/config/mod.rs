//! Configuration management for the dip buyer.
//!
//! Settings are read from an optional config file and the environment, then
//! validated into an immutable [`SessionConfig`] that lives for one request.

use crate::error::{BotError, BotResult};
use crate::exchange::{Category, OrderKind};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Raw settings as found in the environment / config file.
///
/// Every value is optional here; presence and format are checked by
/// [`SessionConfig::from_settings`]. Environment keys are the upper-cased
/// field names (`SYMBOL`, `DIPS_RATIO`, ...).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub category: Option<String>,
    pub symbol: Option<String>,
    pub is_market: Option<String>,
    pub is_exit: Option<String>,
    pub dips_ratio: Option<String>,
    /// Notional per entry, in quote currency
    pub sizeusd: Option<String>,
    /// `<api key>.<api secret>`
    pub bybit: Option<String>,
    pub bybit_api_key: Option<String>,
    pub bybit_api_secret: Option<String>,
    pub orderlinkid: Option<String>,
    pub is_test: Option<String>,
    pub bybit_testnet: Option<String>,
    pub bybit_base_url: Option<String>,
    pub request_timeout_secs: Option<String>,
    pub qty_precision: Option<String>,
}

impl Settings {
    /// Load settings from `config.*` (optional) and environment variables.
    pub fn load() -> BotResult<Self> {
        Self::load_from(config::Environment::default())
    }

    /// Load settings with an explicit environment source layered over `config.*`.
    pub fn load_from(environment: config::Environment) -> BotResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(environment)
            .build()
            .map_err(|e| BotError::Configuration(format!("failed to build configuration: {}", e)))?;

        config
            .try_deserialize()
            .map_err(|e| BotError::Configuration(format!("failed to read configuration: {}", e)))
    }
}

/// Connection settings for the exchange client.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_key: String,
    pub api_secret: String,
    /// Use testnet instead of production
    pub testnet: bool,
    /// Explicit base URL, takes precedence over `testnet`
    pub base_url: Option<String>,
    /// Deadline for each REST call
    pub request_timeout_secs: u64,
}

/// Immutable per-request evaluation context.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub exchange: ExchangeConfig,
    pub category: Category,
    pub symbol: String,
    pub order_kind: OrderKind,
    /// Place reduce-only exits for recent positions
    pub exit_enabled: bool,
    /// Negative fraction, e.g. -0.002
    pub dip_threshold: Decimal,
    /// Notional per entry, in quote currency
    pub order_size: Decimal,
    /// Stable client id of the pending order
    pub order_link_id: String,
    /// Log orders instead of submitting them
    pub dry_run: bool,
    /// Decimal places for the entry quantity; exact when `None`
    pub qty_precision: Option<u32>,
}

fn default_request_timeout() -> u64 {
    10
}

fn required<'a>(value: &'a Option<String>, key: &str) -> BotResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BotError::Configuration(format!("{} is required", key))),
    }
}

fn flag(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn decimal(value: &Option<String>, key: &str) -> BotResult<Decimal> {
    let raw = required(value, key)?;
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| BotError::Configuration(format!("{} is not a decimal: {}", key, raw)))
}

fn optional_number<T: FromStr>(value: &Option<String>, key: &str) -> BotResult<Option<T>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| BotError::Configuration(format!("{} is not a number: {}", key, raw))),
    }
}

impl SessionConfig {
    /// Load and validate the session from the process environment.
    pub fn load() -> BotResult<Self> {
        Self::from_settings(&Settings::load()?)
    }

    /// Validate raw settings.
    pub fn from_settings(settings: &Settings) -> BotResult<Self> {
        let category = required(&settings.category, "CATEGORY")?
            .parse::<Category>()
            .map_err(BotError::Configuration)?;
        let symbol = required(&settings.symbol, "SYMBOL")?.to_string();

        let order_kind = if flag(&settings.is_market) {
            OrderKind::Market
        } else {
            OrderKind::Limit
        };

        let dip_threshold = decimal(&settings.dips_ratio, "DIPS_RATIO")?;
        if dip_threshold >= Decimal::ZERO {
            return Err(BotError::Configuration(format!(
                "DIPS_RATIO must be negative, got {}",
                dip_threshold
            )));
        }
        let order_size = decimal(&settings.sizeusd, "SIZEUSD")?;

        let (api_key, api_secret) = Self::credentials(settings)?;
        let order_link_id = required(&settings.orderlinkid, "ORDERLINKID")?.to_string();

        let exchange = ExchangeConfig {
            api_key,
            api_secret,
            testnet: flag(&settings.bybit_testnet),
            base_url: settings
                .bybit_base_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            request_timeout_secs: optional_number(
                &settings.request_timeout_secs,
                "REQUEST_TIMEOUT_SECS",
            )?
            .unwrap_or_else(default_request_timeout),
        };

        Ok(Self {
            exchange,
            category,
            symbol,
            order_kind,
            exit_enabled: flag(&settings.is_exit),
            dip_threshold,
            order_size,
            order_link_id,
            dry_run: flag(&settings.is_test),
            qty_precision: optional_number(&settings.qty_precision, "QTY_PRECISION")?,
        })
    }

    /// Key pair from `BYBIT=<key>.<secret>`, or the two separate variables.
    fn credentials(settings: &Settings) -> BotResult<(String, String)> {
        if let Some(combined) = settings.bybit.as_deref().filter(|v| !v.trim().is_empty()) {
            let mut parts = combined.trim().split('.');
            return match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(secret), None) if !key.is_empty() && !secret.is_empty() => {
                    Ok((key.to_string(), secret.to_string()))
                }
                _ => Err(BotError::Configuration(
                    "BYBIT must be <api key>.<api secret>".to_string(),
                )),
            };
        }

        let key = required(&settings.bybit_api_key, "BYBIT_API_KEY")
            .map_err(|_| BotError::Configuration("BYBIT_API_KEY and BYBIT_API_SECRET are required".to_string()))?;
        let secret = required(&settings.bybit_api_secret, "BYBIT_API_SECRET")
            .map_err(|_| BotError::Configuration("BYBIT_API_KEY and BYBIT_API_SECRET are required".to_string()))?;
        Ok((key.to_string(), secret.to_string()))
    }

    pub fn is_market(&self) -> bool {
        self.order_kind == OrderKind::Market
    }
}
